use actix_cors::Cors;
use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, post, web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use carrier_scraper_lib::delivery::{self, Mailer, SmtpMailer};
use carrier_scraper_lib::{
    logger, AppConfig, BatchOutcome, BatchRun, ContactScraper, CsvArtifact, EmailSource,
    HeadlessChrome, McRange, OutputLayout, RecordSource, SaferApiClient,
};

const INDEX_HTML: &str = include_str!("../static/index.html");
const NO_DATA_MESSAGE: &str = "No valid data found matching the criteria.";

struct AppState {
    records: Arc<dyn RecordSource>,
    emails: Arc<dyn EmailSource>,
    /// `None` when SMTP credentials are not configured.
    mailer: Option<Arc<dyn Mailer>>,
    output_dir: PathBuf,
    item_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default = "default_start_mc")]
    start_mc: u64,
    #[serde(default = "default_end_mc")]
    end_mc: u64,
    #[serde(default)]
    user_email: Option<String>,
}

fn default_start_mc() -> u64 {
    1_560_000
}

fn default_end_mc() -> u64 {
    1_560_100
}

fn plain(mut builder: actix_web::HttpResponseBuilder, body: impl Into<String>) -> HttpResponse {
    builder
        .content_type("text/plain; charset=utf-8")
        .body(body.into())
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

#[get("/api/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json("Server is running")
}

/// Runs the whole batch inside the request. For a big range this holds the
/// connection open for as long as the walk takes.
#[post("/generate-csv")]
async fn generate_csv(
    req: HttpRequest,
    form: web::Form<GenerateForm>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let form = form.into_inner();

    let range = match McRange::new(form.start_mc, form.end_mc) {
        Ok(range) => range,
        Err(e) => return plain(HttpResponse::BadRequest(), e.to_string()),
    };

    let recipient = match form.user_email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(address) => {
            let Some(mailer) = data.mailer.clone() else {
                return plain(
                    HttpResponse::ServiceUnavailable(),
                    "Email delivery is not configured on this server.",
                );
            };
            match delivery::parse_recipient(address) {
                Ok(mailbox) => Some((mailbox, mailer)),
                Err(e) => return plain(HttpResponse::BadRequest(), e.to_string()),
            }
        }
    };

    let layout = if recipient.is_some() {
        OutputLayout::RecordOnly
    } else {
        OutputLayout::WithScrapedEmail
    };
    let run = BatchRun::new(range, layout, &data.output_dir);
    log::info!(
        "Batch requested for MC {}..={} under {:?}",
        range.start(),
        range.end(),
        data.output_dir
    );

    let state = data.clone();
    let outcome = web::block(move || {
        run.execute(state.records.as_ref(), state.emails.as_ref(), state.item_delay)
    })
    .await;

    let artifact = match outcome {
        Ok(Ok(BatchOutcome::Rows(artifact))) => artifact,
        Ok(Ok(BatchOutcome::NoData)) => return plain(HttpResponse::BadRequest(), NO_DATA_MESSAGE),
        Ok(Err(e)) => {
            log::error!("Batch failed: {}", e);
            return plain(HttpResponse::InternalServerError(), format!("Batch failed: {}", e));
        }
        Err(e) => {
            log::error!("Batch worker failed: {}", e);
            return plain(HttpResponse::InternalServerError(), "Batch worker failed.");
        }
    };

    match recipient {
        None => download(artifact, &req).await,
        Some((mailbox, mailer)) => {
            let address = mailbox.to_string();
            let sent = web::block(move || delivery::email_artifact(mailer.as_ref(), &mailbox, artifact)).await;
            match sent {
                Ok(Ok(())) => plain(HttpResponse::Ok(), format!("CSV sent to {}", address)),
                Ok(Err(e)) => plain(HttpResponse::BadGateway(), format!("Failed to send email: {}", e)),
                Err(e) => {
                    log::error!("Mail worker failed: {}", e);
                    plain(HttpResponse::InternalServerError(), "Mail worker failed.")
                }
            }
        }
    }
}

async fn download(artifact: CsvArtifact, req: &HttpRequest) -> HttpResponse {
    let file = match NamedFile::open_async(artifact.path()).await {
        Ok(file) => file,
        Err(e) => {
            log::error!("Could not open {:?} for download: {}", artifact.path(), e);
            return plain(HttpResponse::InternalServerError(), "Result file could not be read.");
        }
    };

    file.set_content_disposition(ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(artifact.file_name())],
    })
    .into_response(req)
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(health_check)
        .service(generate_csv);
}

fn build_state(config: &AppConfig) -> Result<AppState, Box<dyn Error>> {
    let records: Arc<dyn RecordSource> = Arc::new(SaferApiClient::new(config)?);
    let emails: Arc<dyn EmailSource> = Arc::new(ContactScraper::new(
        HeadlessChrome::new(config),
        config.debug_dir.clone(),
    ));
    let mailer: Option<Arc<dyn Mailer>> = if config.email_delivery_enabled() {
        Some(Arc::new(SmtpMailer::from_config(&config.smtp)?))
    } else {
        log::warn!("SMTP credentials not set; email delivery disabled");
        None
    };

    Ok(AppState {
        records,
        emails,
        mailer,
        output_dir: config.output_dir.clone(),
        item_delay: config.item_delay,
    })
}

async fn serve(state: web::Data<AppState>, bind_addr: String) -> std::io::Result<()> {
    log::info!("Starting Web Server at http://{}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();

    let config = AppConfig::load()?;
    // Built before the runtime starts: the blocking HTTP client must not be
    // created on an async worker.
    let state = web::Data::new(build_state(&config)?);

    actix_web::rt::System::new().block_on(serve(state.clone(), config.bind_addr.clone()))?;
    Ok(())
}
