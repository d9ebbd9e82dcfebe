use clap::Parser;

/// Server settings, taken from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "blog_backend", about = "In-memory blog post API")]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "BLOG_API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "BLOG_API_PORT", default_value_t = 5002)]
    pub port: u16,

    /// Start with an empty collection instead of the seed posts.
    #[arg(long, env = "BLOG_API_NO_SEED")]
    pub no_seed: bool,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
