use std::io::Write;

use pdf_rag::infrastructure::{init_tracing, AppConfig, Pipeline};
use tracing::info;

const DEFAULT_CONFIG: &str = "config/query.yaml";
const DEFAULT_PROMPTS: &str = "config/prompts.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("query=info,pdf_rag=info");

    let config = AppConfig::from_env(DEFAULT_CONFIG, DEFAULT_PROMPTS)?;
    let question = config.config.pipeline.question.clone();
    let pipeline = Pipeline::from_config(config);

    let index = pipeline.acquire_index().await?;
    let query_engine = pipeline.query_engine(&index);

    let response = query_engine.query(&question).await?;
    println!("{response}");
    info!(sources = response.source_nodes.len(), "synchronous answer done");

    let streaming = query_engine.query_streaming(&question).await?;
    let mut stdout = std::io::stdout();
    let streamed = streaming.print_response_stream(&mut stdout).await?;
    stdout.flush()?;
    info!(chars = streamed.response.len(), "streamed answer done");

    Ok(())
}
