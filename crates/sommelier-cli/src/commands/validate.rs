use crate::context::AppContext;
use sommelier_core::validation::InputValidator;

pub fn run(ctx: &AppContext, text: &str) {
    let result = InputValidator::new(ctx.config.validation.clone()).validate(text);
    match result.reason {
        None => println!("✅ Accepted"),
        Some(reason) => {
            println!("❌ Rejected: {reason}");
            println!("   {}", reason.user_message());
        }
    }
}
