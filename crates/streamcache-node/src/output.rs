use colored::Colorize;
use streamcache::{CacheStats, Order};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn orders_table(orders: &[Order]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Cost", "Delivered"]);
    for order in orders {
        builder.push_record([
            order.id.to_string(),
            order.name.clone(),
            order.cost.to_string(),
            order.delivered.to_string(),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn print_orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders cached.");
        return;
    }
    println!("{}", orders_table(orders));
    println!("Total: {}", orders.len());
}

pub fn print_order(order: &Order) {
    println!("{} {}", "Order:".cyan(), order.id.to_string().cyan());
    println!("{}: {}", "Name".cyan(), order.name);
    println!("{}: {}", "Cost".cyan(), order.cost);
    println!("{}: {}", "Delivered".cyan(), order.delivered);
}

pub fn print_stats(stats: &CacheStats) {
    println!(
        "{}: entries={} applied={} skipped={} read_errors={}",
        "Stats".cyan(),
        stats.entries,
        stats.applied,
        stats.skipped,
        stats.read_errors
    );
}
