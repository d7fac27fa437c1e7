#[derive(Debug, clap::Parser)]
#[command(name = "sci-probe", about = "Index a file the way the editor bridge does and translate positions")]
pub struct Args {
    /// File to load into the simulated engine.
    pub file: std::path::PathBuf,

    /// Char position (UTF-16 units) to translate to a byte offset.
    #[arg(long = "char", value_name = "N")]
    pub chars: Vec<usize>,

    /// Byte offset to translate to a char position.
    #[arg(long = "byte", value_name = "N")]
    pub bytes: Vec<usize>,

    /// Line to describe.
    #[arg(long = "line", value_name = "N")]
    pub lines: Vec<usize>,

    /// Native module config (TOML).
    #[arg(long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,
}
