use std::time::Duration;

use anyhow::Result;
use streamcache::{NewOrder, Order, OrderCache, OrderId};

use crate::cli::{DeleteArgs, DumpArgs, GetArgs, SaveArgs, UpdateArgs};
use crate::config::AppConfig;
use crate::output::{print_order, print_orders, print_stats, print_success, print_warning};

async fn publisher_cache(config: &AppConfig) -> Result<OrderCache> {
    super::start_cache(config, super::publish_only(&config.cache)).await
}

async fn replayed_cache(config: &AppConfig, timeout: u64) -> Result<OrderCache> {
    let cache = super::start_cache(config, config.cache.clone()).await?;
    if !cache.catch_up(Duration::from_secs(timeout)).await? {
        print_warning(&format!(
            "replay did not finish within {timeout}s; results may be stale"
        ));
    }
    Ok(cache)
}

pub async fn save(config: &AppConfig, args: &SaveArgs) -> Result<()> {
    let cache = publisher_cache(config).await?;
    let result = cache
        .save_at(NewOrder::new(args.name.clone(), args.cost, args.delivered))
        .await;
    cache.shutdown().await;

    let (id, position) = result?;
    print_success(&format!("Saved order {id} (log position {position})"));
    Ok(())
}

pub async fn update(config: &AppConfig, args: &UpdateArgs) -> Result<()> {
    let cache = publisher_cache(config).await?;
    let order = Order::new(
        OrderId::new(args.id.clone()),
        args.name.clone(),
        args.cost,
        args.delivered,
    );
    let result = cache.update(order).await;
    cache.shutdown().await;

    let position = result?;
    print_success(&format!("Updated order {} (log position {position})", args.id));
    Ok(())
}

pub async fn delete(config: &AppConfig, args: &DeleteArgs) -> Result<()> {
    let cache = publisher_cache(config).await?;
    let result = cache.delete(&OrderId::new(args.id.clone())).await;
    cache.shutdown().await;

    let position = result?;
    print_success(&format!("Deleted order {} (log position {position})", args.id));
    Ok(())
}

pub async fn get(config: &AppConfig, args: &GetArgs) -> Result<()> {
    let cache = replayed_cache(config, args.timeout).await?;
    let result = cache.get(&OrderId::new(args.id.clone())).await;
    cache.shutdown().await;

    print_order(&result?);
    Ok(())
}

pub async fn dump(config: &AppConfig, args: &DumpArgs) -> Result<()> {
    let cache = replayed_cache(config, args.timeout).await?;
    let orders = cache.snapshot();
    let stats = cache.stats();
    cache.shutdown().await;

    print_orders(&orders);
    print_stats(&stats);
    Ok(())
}
