use clap::{Parser, Subcommand};

/// 100Gaj property chat API
#[derive(Parser, Debug)]
#[command(name = "gajchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP chat API (GET / and POST /api/v1/chat)
    Serve {
        /// Bind address (default: GAJCHAT_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (default: GAJCHAT_PORT or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Ask one question from the terminal and print the answer
    Ask {
        /// The user's message
        #[arg(value_name = "MESSAGE")]
        message: String,

        /// Prior conversation as a JSON array of {role, content}
        #[arg(long, value_name = "JSON")]
        history: Option<String>,

        /// Print raw SSE frames instead of plain text
        #[arg(long)]
        sse: bool,
    },
}
