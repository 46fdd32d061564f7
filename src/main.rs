use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use vat_ledger_rust::db::SystemClock;
use vat_ledger_rust::{
    api, create_pool, AppConfig, LedgerAggregator, PgStore, PricingCalculator, SaleService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let store = Arc::new(PgStore::new(pool));
    let pricing = PricingCalculator::new(config.pricing.vat()?);
    info!("VAT rate: {}", pricing.vat().rate());

    let sale_service = Arc::new(SaleService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(SystemClock),
        pricing,
    ));
    let ledger_aggregator = Arc::new(LedgerAggregator::new(store));

    // 发票路由
    let sale_routes = Router::new()
        .route("/api/sales/totals", post(api::compute_totals))
        .route("/api/sales", post(api::create_sale))
        .route("/api/sales/:id", patch(api::update_sale))
        .route("/api/sales/:id/history", get(api::sale_history))
        .with_state(sale_service);

    // 台账路由
    let ledger_routes = Router::new()
        .route("/api/parties/:id/ledger", get(api::party_ledger))
        .route("/api/parties/:id/ledger/csv", get(api::party_ledger_csv))
        .with_state(ledger_aggregator);

    // 合并路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(sale_routes)
        .merge(ledger_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST  /api/sales/totals            - price items or a direct entry");
    info!("  POST  /api/sales                   - create invoice");
    info!("  PATCH /api/sales/:id               - edit invoice");
    info!("  GET   /api/sales/:id/history       - edit history");
    info!("  GET   /api/parties/:id/ledger      - party ledger");
    info!("  GET   /api/parties/:id/ledger/csv  - party ledger export");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
