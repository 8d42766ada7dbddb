use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal chat against hosted LLM inference endpoints", long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Inference backend (huggingface, openrouter, ollama)
    #[arg(long, env = "CHAT_BACKEND", default_value = "huggingface")]
    pub backend: String,

    /// API credential for the backend. Falls back to HF_TOKEN, OPENROUTER_API_KEY or OLLAMA_API_KEY.
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Model id (e.g., HuggingFaceH4/zephyr-7b-beta) or a catalogue name:
    /// "Mistral 7B", "Llama 3 8B", "Zephyr 7B", "Microsoft Phi-3". Defaults per backend.
    #[arg(long, env = "CHAT_MODEL")]
    pub model: Option<String>,

    /// Base URL override for the backend API
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let clients handle defaults if None
    pub base_url: Option<String>,

    // --- Prompt Format Args ---
    /// Prompt profile name (chat, zephyr, mistral, llama3, phi3 or one from --profiles-path).
    /// "auto" picks the markup from the model id. Defaults to chat.
    #[arg(long, env = "CHAT_PROFILE")]
    pub profile: Option<String>,

    /// JSON file with extra prompt profiles, keyed by name.
    #[arg(long, env = "PROFILES_PATH")]
    pub profiles_path: Option<String>,

    // --- Generation Args ---
    /// Maximum tokens to generate (50-1000)
    #[arg(long, env = "MAX_TOKENS", default_value = "512")]
    pub max_tokens: u32,

    /// Sampling temperature (0.1-1.0)
    #[arg(long, env = "TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Nucleus sampling top-p (0.1-1.0)
    #[arg(long, env = "TOP_P", default_value = "0.9")]
    pub top_p: f32,

    /// Seconds to wait for a backend reply before failing the turn.
    #[arg(long, env = "TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,

    // --- Session Args ---
    /// Instructions sent as a leading system message.
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Assistant greeting shown when the session starts or is cleared.
    #[arg(long, env = "GREETING")]
    pub greeting: Option<String>,

    /// JSON array of earlier messages to resume from. Loose legacy shapes are accepted.
    #[arg(long, env = "HISTORY_PATH")]
    pub history_path: Option<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
