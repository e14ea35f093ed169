use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rendezvous-server", about = "Rendezvous meeting-point server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/rendezvous.toml")]
    pub config: String,
}
