// Service catalog lookups and endpoint normalization

use std::collections::HashMap;

use super::types::{CatalogEntry, Interface, ServiceType};

/// Strip trailing slashes from an endpoint URL
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Join a normalized endpoint with an API version segment
pub fn build_endpoint_url(base_endpoint: &str, version: &str) -> String {
    let normalized = normalize_endpoint(base_endpoint);
    if version.is_empty() {
        normalized
    } else {
        format!("{}/{}", normalized, version)
    }
}

/// Why a service could not be located in the catalog
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LookupMiss {
    #[error("service is not in the catalog")]
    NotInCatalog,
    #[error("no {0} endpoint in the catalog")]
    NoMatchingEndpoint(Interface),
    #[error("{0} distinct endpoints match")]
    Ambiguous(usize),
}

/// Locate the base URL of one service
pub fn locate_endpoint(
    catalog: &[CatalogEntry],
    service: ServiceType,
    interface: Interface,
    region: Option<&str>,
) -> Result<String, LookupMiss> {
    let entries: Vec<&CatalogEntry> = catalog
        .iter()
        .filter(|entry| entry.service_type == service.as_str())
        .collect();

    if entries.is_empty() {
        return Err(LookupMiss::NotInCatalog);
    }

    let mut urls: Vec<String> = entries
        .iter()
        .flat_map(|entry| entry.endpoints.iter())
        .filter(|ep| ep.interface.eq_ignore_ascii_case(interface.as_str()))
        .filter(|ep| match region {
            Some(region) => {
                ep.region.as_deref() == Some(region) || ep.region_id.as_deref() == Some(region)
            }
            None => true,
        })
        .map(|ep| normalize_endpoint(&ep.url))
        .collect();
    urls.sort();
    urls.dedup();

    match urls.len() {
        0 => Err(LookupMiss::NoMatchingEndpoint(interface)),
        1 => Ok(urls.remove(0)),
        n => Err(LookupMiss::Ambiguous(n)),
    }
}

/// Resolve every known service, omitting the ones that cannot be located
pub fn discover_endpoints(
    catalog: &[CatalogEntry],
    interface: Interface,
    region: Option<&str>,
) -> HashMap<ServiceType, String> {
    let mut endpoints = HashMap::new();

    for service in ServiceType::ALL {
        match locate_endpoint(catalog, service, interface, region) {
            Ok(url) => {
                tracing::debug!(service = %service, url = %url, "Discovered service endpoint");
                endpoints.insert(service, url);
            }
            Err(miss) => {
                tracing::warn!(
                    service = %service,
                    interface = %interface,
                    reason = %miss,
                    "Service endpoint not discovered, service will be unavailable"
                );
            }
        }
    }

    endpoints
}
