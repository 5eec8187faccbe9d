use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::{Context, anyhow};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;

use wichtel_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::IdentityVerifier,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;

    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let verifier = IdentityVerifier::new(&config.identity);

    // 创建服务
    let identity_service = IdentityService::new(pool.clone(), config.admin.clone());
    let class_service = ClassService::new(pool.clone());
    let event_service = EventService::new(pool.clone());
    let participant_service =
        ParticipantService::new(pool.clone(), event_service.clone(), config.events.clone());
    let assignment_service = AssignmentService::new(pool.clone());
    let present_service = PresentService::new(pool.clone());
    let statistics_service =
        StatisticsService::new(pool.clone(), config.events.statistics_window_days);

    tasks::spawn_all(
        event_service.clone(),
        config.events.registration_sweep_interval_secs,
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(verifier.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(identity_service.clone()))
            .app_data(web::Data::new(class_service.clone()))
            .app_data(web::Data::new(event_service.clone()))
            .app_data(web::Data::new(participant_service.clone()))
            .app_data(web::Data::new(assignment_service.clone()))
            .app_data(web::Data::new(present_service.clone()))
            .app_data(web::Data::new(statistics_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .service(
                web::scope("/api")
                    .configure(handlers::users_config)
                    .configure(handlers::classes_config)
                    .configure(handlers::events_config)
                    .configure(handlers::participants_config)
                    .configure(handlers::assignments_config)
                    .configure(handlers::presents_config)
                    .configure(handlers::statistics_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
