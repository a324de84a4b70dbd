use super::format_wait;
use crate::context::AppContext;

pub fn run(ctx: &AppContext) {
    let info = ctx.quota_store().peek();
    println!("📊 Sommelier quota");
    println!("  Used:      {}/{}", info.used, info.limit);
    println!("  Remaining: {}", info.remaining());
    println!("  Resets in: {}", format_wait(info.reset_in));
}
