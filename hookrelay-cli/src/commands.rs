use std::io::Read;
use std::path::Path;

use hookrelay_replay::{RedirectInfo, ReplayService, Transport};
use tracing::info;

use crate::config::CliConfig;
use crate::error::CliError;

/// What a command prints, and whether the process should report success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub success: bool,
    pub output: String,
}

pub fn load_redirect_info(path: &Path) -> Result<RedirectInfo, CliError> {
    let read_error = |source: std::io::Error| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(read_error)?;
        text
    } else {
        std::fs::read_to_string(path).map_err(read_error)?
    };
    Ok(serde_json::from_str(&text)?)
}

/// First non-blank of: the `--url` flag, the document's `redirect_url`, the config default.
pub fn resolve_destination(
    flag: Option<&str>,
    info: &RedirectInfo,
    config: &CliConfig,
) -> Result<String, CliError> {
    [
        flag,
        info.redirect_url.as_deref(),
        config.redirect_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|url| !url.is_empty())
    .map(str::to_string)
    .ok_or(CliError::MissingRedirectUrl)
}

pub async fn replay<T: Transport>(
    service: &ReplayService<T>,
    info: RedirectInfo,
    flag_url: Option<&str>,
    config: &CliConfig,
    json: bool,
) -> Result<Rendered, CliError> {
    let destination = resolve_destination(flag_url, &info, config)?;
    let request = info.request_data.ok_or(CliError::MissingRequestData)?;
    if let Some(session_id) = &info.session_id {
        info!(session_id = %session_id, "replaying request from session");
    }

    let result = service.replay(&destination, &request).await?;
    let output = if json {
        serde_json::to_string_pretty(&result)?
    } else {
        result.status_message()
    };
    Ok(Rendered {
        success: result.success(),
        output,
    })
}

pub async fn probe<T: Transport>(
    service: &ReplayService<T>,
    url: &str,
    json: bool,
) -> Result<Rendered, CliError> {
    let result = service.probe(url).await;
    let output = if json {
        serde_json::to_string_pretty(&result)?
    } else {
        result.status_message()
    };
    Ok(Rendered {
        success: result.accessible,
        output,
    })
}
