//! Calendar discovery and the CalDAV [`RemoteCalendar`] implementation.

use campussync_core::SyncWindow;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::event::{EventRecord, RemoteObject};
use crate::provider::{BoxFuture, RemoteCalendar};

use super::client::{CalDavClient, DavError};
use super::config::CalDavConfig;
use super::xml::{
    calendar_home_set_body, calendar_query_body, current_user_principal_body,
    parse_nested_href, parse_propfind_response, parse_report_response, propfind_calendars_body,
};

/// A resolved calendar collection on a CalDAV server.
pub struct CalDavCalendar {
    url: Url,
    client: Mutex<CalDavClient>,
}

impl CalDavCalendar {
    /// Uses `url` as the calendar collection without running discovery.
    pub fn at(config: CalDavConfig, url: Url) -> SyncResult<Self> {
        let client = CalDavClient::new(config).map_err(discovery_error)?;
        Ok(Self::with_client(url, client))
    }

    fn with_client(url: Url, client: CalDavClient) -> Self {
        Self {
            url,
            client: Mutex::new(client),
        }
    }

    fn object_url(&self, uid: &str) -> Option<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(&format!("{}.ics", uid));
        Some(url)
    }
}

/// Finds the calendar whose URL equals `target_url`.
///
/// Walks `current-user-principal`, then `calendar-home-set`, then lists the
/// home's collections. Each calendar href is resolved against the URL it was
/// listed under and compared to `target_url` as a plain string.
pub async fn resolve_calendar(config: CalDavConfig, target_url: &str) -> SyncResult<CalDavCalendar> {
    info!(url = %config.url, "Connect to CalDAV server");
    let mut client = CalDavClient::new(config.clone()).map_err(discovery_error)?;

    let principal = find_href(
        &mut client,
        &config.url,
        &current_user_principal_body().map_err(|e| discovery_error(e.into()))?,
        "current-user-principal",
    )
    .await?;
    debug!(principal = %principal, "Found principal");

    let home = find_href(
        &mut client,
        &principal,
        &calendar_home_set_body().map_err(|e| discovery_error(e.into()))?,
        "calendar-home-set",
    )
    .await?;
    debug!(home = %home, "Found calendar home");

    info!("Retrieve CalDAV calendar");
    let body = propfind_calendars_body().map_err(|e| discovery_error(e.into()))?;
    let listing = client
        .propfind(home.as_str(), &body, 1)
        .await
        .map_err(discovery_error)?;
    let calendars = parse_propfind_response(&listing).map_err(|e| discovery_error(e.into()))?;

    for calendar in calendars {
        let Ok(url) = home.join(&calendar.href) else {
            debug!(href = %calendar.href, "Skipping unresolvable calendar href");
            continue;
        };
        if url.as_str() == target_url {
            debug!(url = %url, name = ?calendar.display_name, "Matched calendar");
            return Ok(CalDavCalendar::with_client(url, client));
        }
    }

    Err(SyncError::calendar_not_found(format!(
        "no calendar at {} below {}",
        target_url, home
    )))
}

async fn find_href(
    client: &mut CalDavClient,
    url: &Url,
    body: &str,
    prop: &str,
) -> SyncResult<Url> {
    let response = client
        .propfind(url.as_str(), body, 0)
        .await
        .map_err(discovery_error)?;
    let href = parse_nested_href(&response, prop)
        .map_err(|e| discovery_error(e.into()))?
        .ok_or_else(|| SyncError::discovery(format!("{} did not report {}", url, prop)))?;
    url.join(&href)
        .map_err(|e| discovery_error(e.into()))
}

fn discovery_error(err: DavError) -> SyncError {
    if err.is_auth() {
        SyncError::destination_auth(format!("CalDAV discovery failed: {}", err)).with_source(err)
    } else {
        SyncError::discovery(format!("CalDAV discovery failed: {}", err)).with_source(err)
    }
}

impl RemoteCalendar for CalDavCalendar {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    fn search(&self, window: SyncWindow) -> BoxFuture<'_, SyncResult<Vec<RemoteObject>>> {
        Box::pin(async move {
            let (start, end) = window.utc_bounds();
            let body = calendar_query_body(start, end).map_err(|e| query_error(e.into()))?;

            let response = {
                let mut client = self.client.lock().await;
                client
                    .report(self.url.as_str(), &body)
                    .await
                    .map_err(query_error)?
            };

            let mut objects = Vec::new();
            for reported in parse_report_response(&response).map_err(|e| query_error(e.into()))? {
                let href = self
                    .url
                    .join(&reported.href)
                    .map_err(|e| query_error(e.into()))?;
                let object = RemoteObject::new(href.as_str());
                objects.push(match reported.etag {
                    Some(etag) => object.with_etag(etag),
                    None => object,
                });
            }

            debug!(count = objects.len(), "Found existing events");
            Ok(objects)
        })
    }

    fn delete<'a>(&'a self, object: &'a RemoteObject) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(async move {
            let mut client = self.client.lock().await;
            match client.delete(&object.href, object.etag.as_deref()).await {
                Ok(()) => Ok(()),
                Err(DavError::NotFound) => {
                    debug!(href = %object.href, "Event already gone");
                    Ok(())
                }
                Err(e) => Err(SyncError::delete(format!(
                    "DELETE {} failed: {}",
                    object.href, e
                ))
                .with_source(e)),
            }
        })
    }

    fn put(&self, mut event: EventRecord) -> BoxFuture<'_, SyncResult<RemoteObject>> {
        Box::pin(async move {
            let uid = event.ensure_uid();
            let href = self.object_url(&uid).ok_or_else(|| {
                SyncError::put(format!("cannot build an event URL below {}", self.url))
            })?;

            let ics = event.to_ics();
            let mut client = self.client.lock().await;
            let etag = client
                .put(href.as_str(), &ics)
                .await
                .map_err(|e| SyncError::put(format!("PUT {} failed: {}", href, e)).with_source(e))?;

            let object = RemoteObject::new(href.as_str());
            Ok(match etag {
                Some(etag) => object.with_etag(etag),
                None => object,
            })
        })
    }
}

fn query_error(err: DavError) -> SyncError {
    SyncError::query(format!("calendar query failed: {}", err)).with_source(err)
}
