use crate::context::AppContext;
use anyhow::{Context, Result};
use sommelier_core::catalog::Product;
use sommelier_core::conversation::ConversationTurn;
use sommelier_core::response::ParsedResponse;
use sommelier_infrastructure::storage::AtomicJsonFile;
use std::fs;
use std::path::Path;

pub async fn run(
    ctx: &AppContext,
    question: &str,
    catalog_path: &Path,
    history_path: Option<&Path>,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let history_file = history_path.map(|path| AtomicJsonFile::new(path.to_path_buf()));
    let history = match &history_file {
        Some(file) => load_history(file)?,
        None => Vec::new(),
    };

    let service = ctx.service()?;
    let reply = match service.submit(question, &catalog, &history).await {
        Ok(reply) => reply,
        Err(rejection) => {
            eprintln!("⚠️  {}", rejection.user_message());
            return Ok(());
        }
    };

    print_reply(&reply, &catalog);

    if let Some(file) = &history_file {
        append_turns(file, question, &reply)?;
    }

    let info = service.rate_limit_info();
    println!("\n({} of {} questions left)", info.remaining(), info.limit);
    Ok(())
}

fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))
}

fn load_history(file: &AtomicJsonFile<Vec<ConversationTurn>>) -> Result<Vec<ConversationTurn>> {
    let history = file
        .load()
        .with_context(|| format!("Failed to read history {}", file.path().display()))?;
    Ok(history.unwrap_or_default())
}

fn append_turns(
    file: &AtomicJsonFile<Vec<ConversationTurn>>,
    question: &str,
    reply: &ParsedResponse,
) -> Result<()> {
    file.update(Vec::new(), |history| {
        history.push(ConversationTurn::user(question.trim()));
        history.push(ConversationTurn::assistant(
            reply.text.clone(),
            reply.recommended_ids.clone(),
        ));
    })
    .with_context(|| format!("Failed to write history {}", file.path().display()))
}

fn print_reply(reply: &ParsedResponse, catalog: &[Product]) {
    println!("🍷 {}", reply.text);

    let products = reply.recommended_products(catalog);
    if products.is_empty() {
        return;
    }
    println!("\nRecommended:");
    for product in products {
        println!(
            "  - [{}] {} by {} ({})",
            product.id, product.name, product.brand, product.olfactory_family
        );
    }
}
