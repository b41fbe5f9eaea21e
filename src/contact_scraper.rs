use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::browser::{BrowserPage, PageRenderer};
use crate::extractor::{EmailExtraction, Extractor};
use crate::record::Lookup;

const REGISTRATION_URL_TEMPLATE: &str =
    "https://ai.fmcsa.dot.gov/SMS/Carrier/{usdot}/CarrierRegistration.aspx";

pub fn registration_url(usdot: &str) -> String {
    REGISTRATION_URL_TEMPLATE.replace("{usdot}", usdot)
}

/// Anything that can look up a public contact email for a USDOT number.
///
/// `Absent` means the page was reachable but showed no email; `Failed`
/// means it could not be read. Callers write an empty email either way.
pub trait EmailSource: Send + Sync {
    fn scrape_email(&self, usdot: &str) -> Lookup<String>;
}

/// Scrapes the FMCSA carrier registration page.
pub struct ContactScraper<R> {
    renderer: R,
    extractor: Extractor,
    debug_dir: Option<PathBuf>,
}

impl<R: PageRenderer> ContactScraper<R> {
    pub fn new(renderer: R, debug_dir: Option<PathBuf>) -> Self {
        ContactScraper {
            renderer,
            extractor: Extractor::new(),
            debug_dir,
        }
    }

    fn save_diagnostics(&self, session: &mut R::Session, usdot: &str, url: &str, html: Option<&str>) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("USDOT={} - Could not create debug dir {:?}: {}", usdot, dir, e);
            return;
        }

        if let Some(html) = html {
            let page_path = dir.join(format!("debug_usdot_{}.html", usdot));
            if let Err(e) = fs::write(&page_path, html) {
                warn!("USDOT={} - Could not save page source: {}", usdot, e);
            }
        }
        let shot_path = dir.join(format!("debug_usdot_{}.png", usdot));
        if let Err(e) = session.screenshot(url, &shot_path) {
            warn!("USDOT={} - Could not save screenshot: {}", usdot, e);
        }
    }
}

impl<R: PageRenderer> EmailSource for ContactScraper<R> {
    fn scrape_email(&self, usdot: &str) -> Lookup<String> {
        let usdot = usdot.trim();
        if usdot.is_empty() || !usdot.chars().all(|c| c.is_ascii_digit()) {
            warn!("Skipping email scrape for unusable USDOT {:?}", usdot);
            return Lookup::Absent;
        }

        let url = registration_url(usdot);
        // The session is dropped (browser killed, profile deleted) on every
        // return path below.
        let mut session = match self.renderer.open() {
            Ok(session) => session,
            Err(e) => {
                warn!("USDOT={} - Could not start browser: {}", usdot, e);
                return Lookup::Failed(e.to_string());
            }
        };

        let html = match session.dump_dom(&url) {
            Ok(html) => html,
            Err(e) => {
                warn!("USDOT={} - Email scrape error: {}", usdot, e);
                self.save_diagnostics(&mut session, usdot, &url, None);
                return Lookup::Failed(e.to_string());
            }
        };

        match self.extractor.extract_email(&html) {
            EmailExtraction::Found(email) => {
                info!("USDOT={} - Found email {}", usdot, email);
                Lookup::Found(email)
            }
            EmailExtraction::EmptyValue => {
                info!("USDOT={} - Email label present but empty", usdot);
                self.save_diagnostics(&mut session, usdot, &url, Some(&html));
                Lookup::Absent
            }
            EmailExtraction::NoLabel => {
                warn!("USDOT={} - No email label on page", usdot);
                self.save_diagnostics(&mut session, usdot, &url, Some(&html));
                Lookup::Absent
            }
        }
    }
}
