use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use buysell_match::config::Settings;
use buysell_match::routes::{self, AppState};
use buysell_match::services::{Classifier, ElasticsearchClient, OpenAiClassifier, PostgresStore, RecordStore, SearchIndex};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        startup_error("Configuration error", e)
    })?;

    init_tracing(&settings.logging.level, &settings.logging.format);

    info!("Starting buy/sell matching service...");

    // System of record
    let store = PostgresStore::from_settings(&settings.database).await.map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        startup_error("PostgreSQL connection error", e)
    })?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    info!("PostgreSQL store initialized");

    // Search index (optional - matching and chat search report unavailable without it)
    let index: Option<Arc<dyn SearchIndex>> = match settings.search.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            let client = ElasticsearchClient::new(url, &settings.search.index, settings.search.timeout_secs)
                .map_err(|e| startup_error("Search client error", e))?;
            if let Err(e) = client.ensure_index().await {
                warn!("Could not ensure search index {}: {}", client.index_name(), e);
            }
            info!("Search index {} at {}", client.index_name(), url);
            Some(Arc::new(client))
        }
        _ => {
            warn!("No search URL configured, running with search disabled");
            None
        }
    };

    // Classifier (a missing API key surfaces per request)
    let classifier = OpenAiClassifier::new(&settings.classifier)
        .map_err(|e| startup_error("Classifier error", e))?;
    info!("Classifier initialized with model {}", classifier.model());
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);

    info!("Matching weights: {:?}", settings.boost_weights());

    let app_state = AppState::new(
        classifier,
        store,
        index,
        settings.matching.clone(),
        settings.search.clone(),
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
