use anyhow::Context;

use agromarket_infra::AppConfig;

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    agromarket_observability::init(config.log_format);

    tracing::info!(
        vat = %config.pricing.default_vat,
        withholding = %config.pricing.default_withholding,
        expiry_window_days = config.expiry_window_days,
        "configuration loaded"
    );

    let marketplace = agromarket_app::Marketplace::new(&config);
    let summary = agromarket_app::run_demo(&marketplace).context("scripted checkout failed")?;

    tracing::info!(
        order_id = %summary.order_id,
        total = summary.total,
        invoice = %summary.invoice_number,
        orders = summary.stats.order_count,
        revenue = summary.stats.total_revenue,
        "demo checkout finished"
    );
    Ok(())
}
