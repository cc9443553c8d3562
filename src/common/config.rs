/// Compiler configuration shared between the driver and the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Print each generated class file and other progress output
    pub verbose: bool,
    /// Output directory for .class files
    pub output_dir: String,
    /// Extra classpath entries (directories or jar/zip archives)
    pub classpath: Vec<String>,
    /// Whether to locate and use the platform runtime archive
    pub use_runtime: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            output_dir: ".".to_string(),
            classpath: Vec::new(),
            use_runtime: true,
        }
    }
}

impl Config {
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn without_runtime(mut self) -> Self {
        self.use_runtime = false;
        self
    }
}
