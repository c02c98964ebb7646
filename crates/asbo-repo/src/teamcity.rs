//! TeamCity repository driver.
//!
//! Versions are successful build numbers of a per-package build
//! configuration; archives and manifests are build artifacts fetched through
//! `repository/download`. TeamCity repositories are read-only: publishing
//! goes through a file or FTP source.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::events::Event;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use semver::Version;

use asbo_core::manifest::MANIFEST_FILE;
use asbo_core::template::PathTemplate;
use asbo_core::workspace::SourceEntry;
use asbo_util::errors::AsboError;

use crate::backend::{RepositoryBackend, PACKAGE_EXTENSION};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct TeamCityRepository {
    client: Client,
    base_url: String,
    build_type: PathTemplate,
    username: Option<String>,
    password: Option<String>,
}

impl TeamCityRepository {
    pub fn from_source(source: &SourceEntry) -> Result<Self, AsboError> {
        let url = source.url.as_ref().ok_or_else(|| AsboError::Config {
            message: "teamcity sources require a 'url'".to_string(),
        })?;
        let build_type = source.build_type.as_ref().ok_or_else(|| AsboError::Config {
            message: "teamcity sources require a 'build-type' template".to_string(),
        })?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("asbo/0.3")
            .build()
            .map_err(|e| AsboError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            build_type: PathTemplate::new(build_type.clone()),
            username: source.username.clone(),
            password: source.password.clone(),
        })
    }

    fn auth_segment(&self) -> &'static str {
        if self.username.is_some() {
            "httpAuth"
        } else {
            "guestAuth"
        }
    }

    fn builds_url(&self, package: &str) -> String {
        format!(
            "{}/{}/app/rest/buildTypes/id:{}/builds?status=SUCCESS&count=100",
            self.base_url,
            self.auth_segment(),
            self.build_type.expand(package, "")
        )
    }

    fn artifact_url(&self, package: &str, version: &str, filename: &str) -> String {
        format!(
            "{}/{}/repository/download/{}/{}/{}",
            self.base_url,
            self.auth_segment(),
            self.build_type.expand(package, version),
            version,
            filename
        )
    }

    /// GET a URL with authentication and retries.
    ///
    /// Returns `Ok(None)` for 404 (artifact not found), retries server
    /// errors and connection timeouts.
    fn get(&self, url: &str) -> Result<Option<Vec<u8>>, AsboError> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                std::thread::sleep(RETRY_DELAY * attempt);
            }

            let mut req = self.client.get(url);
            if let Some(ref user) = self.username {
                req = req.basic_auth(user, self.password.as_deref());
            }

            match req.send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        return Err(AsboError::Auth {
                            message: format!("HTTP {status} from {url}"),
                        });
                    }
                    if status.is_server_error() {
                        last_err = format!("HTTP {status} from {url}");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(AsboError::Network {
                            message: format!("HTTP {status} fetching {url}"),
                        });
                    }
                    let bytes = resp.bytes().map_err(|e| AsboError::Network {
                        message: format!("Failed to read response from {url}: {e}"),
                    })?;
                    return Ok(Some(bytes.to_vec()));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = format!("{e}");
                    continue;
                }
                Err(e) => {
                    return Err(AsboError::Network {
                        message: format!("Request to {url} failed: {e}"),
                    });
                }
            }
        }

        Err(AsboError::Network {
            message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
        })
    }
}

impl RepositoryBackend for TeamCityRepository {
    fn list_versions(&self, package: &str) -> Result<Vec<String>, AsboError> {
        let url = self.builds_url(package);
        let body = match self.get(&url)? {
            Some(body) => body,
            None => {
                tracing::warn!("No TeamCity build configuration for {package}");
                return Ok(Vec::new());
            }
        };
        let text = String::from_utf8_lossy(&body);
        parse_build_numbers(&text)
    }

    fn fetch_manifest(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Option<Vec<u8>>, AsboError> {
        let url = self.artifact_url(package, &version.to_string(), MANIFEST_FILE);
        self.get(&url)
    }

    fn fetch_package(&self, package: &str, version: &Version) -> Result<PathBuf, AsboError> {
        let filename = format!("{package}-{version}{PACKAGE_EXTENSION}");
        let url = self.artifact_url(package, &version.to_string(), &filename);
        let data = self.get(&url)?.ok_or_else(|| not_found(package, version))?;

        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&data)?;
        let (_, path) = file.keep().map_err(|e| AsboError::Io(e.error))?;
        tracing::debug!("Downloaded {url} to {}", path.display());
        Ok(path)
    }

    fn publish(
        &self,
        package: &str,
        _version: &Version,
        _archive: &Path,
        _manifest: &Path,
        _overwrite: bool,
    ) -> Result<(), AsboError> {
        Err(AsboError::Config {
            message: format!(
                "the teamcity source for '{package}' is read-only; publish through a file or ftp source"
            ),
        })
    }
}

/// Pull the `number` attribute out of every `<build .../>` element.
fn parse_build_numbers(xml: &str) -> Result<Vec<String>, AsboError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut versions = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"build" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"number" {
                        versions.push(String::from_utf8_lossy(&attr.value).to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(AsboError::Network {
                    message: format!("Malformed TeamCity response: {e}"),
                });
            }
        }
    }
    Ok(versions)
}

fn not_found(package: &str, version: &Version) -> AsboError {
    AsboError::Network {
        message: format!("no TeamCity artifact for {package}-{version} (HTTP 404)"),
    }
}
