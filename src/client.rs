use clap::Parser;
use serde_json::json;

#[derive(Parser, Debug)]
pub struct ClientArgs {
    /// Server URL like http://127.0.0.1:3000/
    #[arg(short, long, default_value = "http://127.0.0.1:3000/")]
    pub url: String,

    /// Method to call (ping|sum|new_token)
    #[arg(short, long)]
    pub method: String,

    /// Params as JSON string, e.g. '{"a":1,"b":2}'
    #[arg(short, long, default_value = "{}")]
    pub params: String,
}

/// POST a single JSON-RPC request and print the response envelope.
pub async fn run_client(args: ClientArgs) -> anyhow::Result<()> {
    let params_value: serde_json::Value = serde_json::from_str(&args.params)?;
    let req = json!({
        "jsonrpc": "2.0",
        "method": args.method,
        "params": params_value,
        "id": 1
    });

    let client = reqwest::Client::new();
    let resp = client.post(&args.url).json(&req).send().await?;
    let body: serde_json::Value = resp.json().await?;
    println!("Response: {}", body);

    Ok(())
}

/// Fetch the service description document with a plain GET.
pub async fn run_discover(url: &str) -> anyhow::Result<()> {
    let body: serde_json::Value = reqwest::get(url).await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
