use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::debug;

type InputResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Read a request from `--input` or piped stdin.
///
/// Returns `None` when neither is supplied.
pub fn read_request<T: DeserializeOwned>(path: Option<&str>) -> InputResult<Option<T>> {
    if let Some(path) = path {
        debug!(path, "reading input file");
        return request_file(Path::new(path)).map(Some);
    }
    match piped_stdin()? {
        Some(text) => {
            debug!(bytes = text.len(), "reading input from stdin");
            let request = serde_json::from_str(&text)
                .map_err(|e| format!("Invalid request on stdin: {e}"))?;
            Ok(Some(request))
        }
        None => Ok(None),
    }
}

/// Like [`read_request`], falling back to the type's defaults.
pub fn read_or_default<T: DeserializeOwned + Default>(path: Option<&str>) -> InputResult<T> {
    Ok(read_request(path)?.unwrap_or_else(|| {
        debug!("no input supplied, using defaults");
        T::default()
    }))
}

/// Parse the JSON request stored at `path`, relative paths resolving
/// against the working directory.
fn request_file<T: DeserializeOwned>(path: &Path) -> InputResult<T> {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    if !full.is_file() {
        return Err(format!("No request file at {}", full.display()).into());
    }
    let text = std::fs::read_to_string(&full)
        .map_err(|e| format!("Cannot read {}: {e}", full.display()))?;
    let request = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid request in {}: {e}", full.display()))?;
    Ok(request)
}

/// Text piped on stdin, or `None` for a terminal or blank input.
fn piped_stdin() -> InputResult<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_owned()))
}
