//! HTTP surface over the engine: the read-side metrics routes, the
//! ingest upload, and a health probe.

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use serde_json::json;
use tracing::info;

use crate::api_types::{
    GeoQuery, GeoResponse, InfluencersQuery, InfluencersResponse, IngestResponse, KeywordsQuery,
    KeywordsResponse, StatusResponse, TimeSeriesQuery, TopicsQuery, TopicsResponse,
};
use crate::engine::MetricsEngine;
use crate::models::{Freq, SortKey};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(StatusResponse::ok())
}

#[get("/summary")]
async fn summary(engine: web::Data<MetricsEngine>) -> impl Responder {
    HttpResponse::Ok().json(engine.sentiment_summary())
}

#[get("/time_series")]
async fn time_series(
    engine: web::Data<MetricsEngine>,
    query: web::Query<TimeSeriesQuery>,
) -> impl Responder {
    match Freq::parse(&query.freq) {
        Some(freq) => HttpResponse::Ok().json(engine.sentiment_time_series(freq)),
        None => HttpResponse::BadRequest()
            .json(json!({ "detail": format!("unsupported freq '{}'", query.freq) })),
    }
}

#[get("/keywords")]
async fn keywords(
    engine: web::Data<MetricsEngine>,
    query: web::Query<KeywordsQuery>,
) -> impl Responder {
    let keywords = engine.top_keywords(query.sentiment.as_deref(), query.top);
    HttpResponse::Ok().json(KeywordsResponse { keywords })
}

#[get("/topics")]
async fn topics(
    engine: web::Data<MetricsEngine>,
    query: web::Query<TopicsQuery>,
) -> impl Responder {
    let topics = engine.topic_breakdown(&query.sentiment);
    HttpResponse::Ok().json(TopicsResponse { topics })
}

#[get("/influencers")]
async fn influencers(
    engine: web::Data<MetricsEngine>,
    query: web::Query<InfluencersQuery>,
) -> impl Responder {
    let influencers = engine.top_influencers(
        query.sentiment.as_deref(),
        query.limit,
        SortKey::parse(&query.sort_by),
    );
    HttpResponse::Ok().json(InfluencersResponse { influencers })
}

#[get("/geo")]
async fn geo(engine: web::Data<MetricsEngine>, query: web::Query<GeoQuery>) -> impl Responder {
    let geo = engine.geo_distribution(query.top);
    HttpResponse::Ok().json(GeoResponse { geo })
}

#[post("/recompute")]
async fn recompute(engine: web::Data<MetricsEngine>) -> impl Responder {
    engine.clear();
    HttpResponse::Ok().json(StatusResponse::ok())
}

#[post("/ingest_csv")]
async fn ingest_csv(engine: web::Data<MetricsEngine>, body: web::Bytes) -> impl Responder {
    match engine.ingest(&body) {
        Ok(rows_loaded) => HttpResponse::Ok().json(IngestResponse { rows_loaded }),
        Err(err) => HttpResponse::InternalServerError()
            .json(json!({ "detail": format!("ingest failed: {err:#}") })),
    }
}

/// Route table shared by the real server and the test harness.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api/v1")
            .service(
                web::scope("/metrics")
                    .service(summary)
                    .service(time_series)
                    .service(keywords)
                    .service(topics)
                    .service(influencers)
                    .service(geo)
                    .service(recompute),
            )
            .service(web::scope("/ingest").service(ingest_csv)),
    );
}

/// Build and bind the HTTP server. CORS stays permissive so the
/// dashboard can call from any origin.
pub fn start_server(engine: MetricsEngine, bind: &str) -> std::io::Result<Server> {
    let data = web::Data::new(engine);
    info!("Starting HTTP server - bind={}", bind);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(data.clone())
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .configure(configure)
    })
    .bind(bind)?
    .run();
    Ok(server)
}
