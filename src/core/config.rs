use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub root_path: PathBuf,
    pub extension: String,
    pub filenames: Vec<String>,      // empty: derived from the model name
    pub finder_cache_size: usize,    // resolved dynamic finder names kept per model
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_path: PathBuf::from("./data"),
            extension: "json".to_string(),
            filenames: Vec::new(),
            finder_cache_size: 128,
        }
    }
}

impl Config {
    pub fn with_root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = root_path.into();
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filenames = vec![filename.into()];
        self
    }

    pub fn with_filenames<I, S>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filenames = filenames.into_iter().map(Into::into).collect();
        self
    }
}
