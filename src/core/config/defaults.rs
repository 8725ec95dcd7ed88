pub const APP_ID: &str = "testapp";
pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 3000;
pub const TOP_K: usize = 3;
pub const MAX_HISTORY: usize = 20;

pub const CLOVA_BASE_URL: &str = "https://clovastudio.apigw.ntruss.com";
pub const CLOVA_STREAM_HOST: &str = "clovastudio.stream.ntruss.com";
pub const CLOVA_GATEWAY_HOST: &str = "clovastudio.apigw.ntruss.com";
pub const EMBED_MODEL: &str = "clir-emb-dolphin";
pub const CHAT_MODEL: &str = "HCX-005";

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

pub const SYSTEM_PROMPT_PATH: &str = "LLM/system_prompt.txt";

/// Used when no prompt file or inline prompt is configured.
pub const FALLBACK_SYSTEM_PROMPT: &str = "당신은 코엑스 행사 안내 도우미입니다. \
제공된 이벤트 정보만 근거로 간결하고 정확하게 한국어로 답하세요. \
정보가 없으면 모른다고 답하세요.";

/// Environment variable → config path overrides, applied after the YAML files.
pub const ENV_OVERRIDES: &[(&str, &[&str])] = &[
    ("APP_ID", &["app", "app_id"]),
    ("HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
    ("TOP_K", &["retrieval", "top_k"]),
    ("MAX_HISTORY", &["conversation", "max_history"]),
    ("HYPERCLOVAX_API_BASE", &["embedding", "base_url"]),
    ("HYPERCLOVAX_API_KEY", &["embedding", "api_key"]),
    ("HYPERCLOVAX_EMBED_MODEL", &["embedding", "model"]),
    ("CLOVA_API_BASE", &["chat", "base_url"]),
    ("CLOVA_API_KEY", &["chat", "api_key"]),
    ("CLOVA_MODEL", &["chat", "model"]),
    ("VECTORS_PATH", &["store", "path"]),
    ("SYSTEM_PROMPT_PATH", &["prompt", "system_prompt_path"]),
    ("GOOGLE_SHEET_ID", &["sheets", "spreadsheet_id"]),
    ("GOOGLE_SHEET_RANGE", &["sheets", "range"]),
    ("GOOGLE_API_KEY", &["sheets", "api_key"]),
    ("GOOGLE_ACCESS_TOKEN", &["sheets", "access_token"]),
    ("GOOGLE_SERVICE_ACCOUNT_EMAIL", &["sheets", "service_account_email"]),
    ("GOOGLE_PRIVATE_KEY", &["sheets", "private_key"]),
    ("QUERY_LOG_SHEET_ID", &["query_log", "spreadsheet_id"]),
    ("QUERY_LOG_RANGE", &["query_log", "range"]),
    ("QUERY_LOG_ACCESS_TOKEN", &["query_log", "access_token"]),
];

/// Overrides whose value must be a number in the merged config.
pub const NUMERIC_ENV_KEYS: &[&str] = &["PORT", "TOP_K", "MAX_HISTORY"];

/// Overrides kept verbatim apart from `\\n` unescaping; no `#` comment stripping.
pub const PEM_ENV_KEYS: &[&str] = &["GOOGLE_PRIVATE_KEY"];
