use super::{json_pretty, EXIT_SUCCESS};
use errpage_core::ReconcilerConfig;
use errpage_store::{ErrorFileStore, StoreLayout};

pub fn run(config: &ReconcilerConfig, json: bool) -> Result<u8, String> {
    let store = ErrorFileStore::new(StoreLayout::new(&config.store_dir));
    let codes = store.list().map_err(|e| format!("store error: {e}"))?;

    if json {
        let entries: Vec<_> = codes
            .iter()
            .map(|&code| {
                let size = std::fs::metadata(store.path(code)).map_or(0, |m| m.len());
                serde_json::json!({
                    "code": code,
                    "path": store.path(code),
                    "bytes": size,
                })
            })
            .collect();
        println!("{}", json_pretty(&entries)?);
    } else if codes.is_empty() {
        println!("no error pages in {}", config.store_dir.display());
    } else {
        for code in codes {
            println!("{code}  {}", store.path(code).display());
        }
    }
    Ok(EXIT_SUCCESS)
}
