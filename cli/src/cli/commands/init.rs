use std::path::Path;

use anyhow::bail;

const STARTER_CONFIG: &str = r#"[server]
host = "127.0.0.1"
port = 3000

[static_files]
root = "."

[timeouts]
request_timeout = 120
connect_timeout = 20

# Forward /api/* to a remote backend, stripping the /api prefix.
# [[rules]]
# prefix = "/api"
# target = "https://api.example.com"
# change_origin = true
# secure = true
"#;

pub fn run() -> anyhow::Result<()> {
    let path = Path::new("devrelay.toml");
    if path.exists() {
        bail!("devrelay.toml already exists in the current directory");
    }

    std::fs::write(path, STARTER_CONFIG)?;
    println!("Wrote devrelay.toml");
    Ok(())
}
