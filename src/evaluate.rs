use pdf_rag::domain::ports::Evaluator;
use pdf_rag::infrastructure::{init_tracing, AppConfig, Pipeline};
use tracing::info;

const DEFAULT_CONFIG: &str = "config/evaluate.yaml";
const DEFAULT_PROMPTS: &str = "config/evaluate_prompts.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("evaluate=info,pdf_rag=info");

    let config = AppConfig::from_env(DEFAULT_CONFIG, DEFAULT_PROMPTS)?;
    let question = config.config.pipeline.question.clone();
    let pipeline = Pipeline::from_config(config);

    let index = pipeline.acquire_index().await?;
    let evaluator = pipeline.faithfulness_evaluator();

    let response = pipeline.query_engine(&index).query(&question).await?;
    println!("{response}");

    // whole answer against every source node
    let eval_result = evaluator.evaluate_response(None, &response).await?;
    println!("{}", eval_result.passing);

    // then each source node on its own
    for (rank, source_node) in response.source_nodes.iter().enumerate() {
        let eval_result = evaluator
            .evaluate(
                None,
                &response.response,
                std::slice::from_ref(&source_node.chunk.content),
            )
            .await?;
        info!(
            rank,
            score = source_node.score,
            passing = eval_result.passing,
            "source node judged"
        );
        println!("{}", eval_result.passing);
    }

    Ok(())
}
