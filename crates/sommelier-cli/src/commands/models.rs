use crate::context::AppContext;
use anyhow::Result;
use sommelier_core::generation::ModelCatalog;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let client = ctx.gemini_client()?;
    let models = client.list_models().await?;

    println!("📋 Upstream models ({}):", models.len());
    for model in &models {
        println!(
            "  - {} [{}]",
            model.model_id(),
            model.supported_generation_methods.join(", ")
        );
    }

    let resolver = ctx.model_resolver(client);
    println!("\n🍷 Resolved model: {}", resolver.resolve().await);
    Ok(())
}
