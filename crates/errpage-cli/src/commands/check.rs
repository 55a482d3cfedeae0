use super::{json_pretty, load_desired, EXIT_DESIRED_ERROR, EXIT_SUCCESS};
use errpage_core::ReconcilerConfig;
use errpage_schema::StatusCode;
use std::path::Path;

pub fn run(config: &ReconcilerConfig, desired_path: &Path, json: bool) -> Result<u8, String> {
    let desired = load_desired(desired_path)?;
    let supported = config.supported_set();

    let mut problems = 0usize;
    let mut verdicts = Vec::with_capacity(desired.len());
    for (raw, entry) in desired.iter() {
        let verdict = match StatusCode::parse(raw) {
            Err(_) => "invalid code",
            Ok(_) if entry.directive.writes_file() && entry.content.is_none() => {
                "missing content"
            }
            Ok(code) if entry.directive.writes_file() && !supported.contains(code) => {
                "unsupported"
            }
            Ok(_) => "ok",
        };
        if verdict != "ok" {
            problems += 1;
        }
        verdicts.push((raw.to_owned(), entry.directive.to_string(), verdict));
    }

    if json {
        let entries: Vec<_> = verdicts
            .iter()
            .map(|(code, directive, verdict)| {
                serde_json::json!({ "code": code, "directive": directive, "verdict": verdict })
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
    } else {
        for (code, directive, verdict) in &verdicts {
            println!("{code:>5}  {directive:<9}  {verdict}");
        }
        println!("check: {} entries, {problems} problems", verdicts.len());
    }

    if problems == 0 {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_DESIRED_ERROR)
    }
}
