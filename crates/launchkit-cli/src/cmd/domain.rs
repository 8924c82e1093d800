use crate::output::print_table;
use anyhow::bail;
use launchkit_core::prompt::{slugify, Validator};
use serde::Deserialize;
use std::time::Duration;

const RDAP_BASE: &str = "https://rdap.org/domain";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq)]
enum Availability {
    Available,
    Registered { expires: Option<String> },
    Unknown(String),
}

impl Availability {
    fn status(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Registered { .. } => "registered",
            Availability::Unknown(_) => "unknown",
        }
    }

    fn detail(&self) -> String {
        match self {
            Availability::Available => String::new(),
            Availability::Registered { expires } => expires
                .as_deref()
                .map(|e| format!("expires {e}"))
                .unwrap_or_default(),
            Availability::Unknown(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    events: Vec<RdapEvent>,
}

#[derive(Debug, Deserialize)]
struct RdapEvent {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: String,
}

impl RdapDomain {
    /// The date part of the `expiration` event, if any.
    fn expires(&self) -> Option<String> {
        self.events
            .iter()
            .find(|e| e.action == "expiration")
            .map(|e| e.date.split('T').next().unwrap_or(&e.date).to_string())
    }
}

/// Fully qualified names to look up. Names with a dot are taken as given;
/// bare names are slugified and tried with every TLD.
fn candidates(names: &[String], tlds: &[String]) -> anyhow::Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let fqdns: Vec<String> = if name.contains('.') {
            vec![name.clone()]
        } else {
            let slug = slugify(name);
            tlds.iter()
                .map(|t| format!("{slug}.{}", t.trim().trim_start_matches('.')))
                .collect()
        };
        for fqdn in fqdns {
            match Validator::Domain.check(&fqdn) {
                Ok(d) if !out.contains(&d) => out.push(d),
                Ok(_) => {}
                Err(msg) => bail!("{msg}"),
            }
        }
    }
    Ok(out)
}

fn lookup(agent: &ureq::Agent, domain: &str) -> Availability {
    let url = format!("{RDAP_BASE}/{domain}");
    match agent.get(&url).call() {
        Ok(resp) => {
            let info: RdapDomain = resp.into_json().unwrap_or_default();
            Availability::Registered {
                expires: info.expires(),
            }
        }
        Err(ureq::Error::Status(404, _)) => Availability::Available,
        Err(ureq::Error::Status(code, _)) => Availability::Unknown(format!("HTTP {code}")),
        Err(e) => Availability::Unknown(e.to_string()),
    }
}

pub fn run(names: &[String], tlds: &[String]) -> anyhow::Result<()> {
    let domains = candidates(names, tlds)?;
    let agent = ureq::AgentBuilder::new().timeout(LOOKUP_TIMEOUT).build();

    let rows: Vec<Vec<String>> = domains
        .iter()
        .map(|d| {
            let result = lookup(&agent, d);
            tracing::debug!(domain = %d, status = result.status(), "rdap lookup");
            vec![d.clone(), result.status().to_string(), result.detail()]
        })
        .collect();
    print_table(&["DOMAIN", "STATUS", "DETAIL"], rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_names_expand_over_tlds() {
        let got = candidates(&strings(&["Acme App"]), &strings(&["com", ".io"])).unwrap();
        assert_eq!(got, strings(&["acme-app.com", "acme-app.io"]));
    }

    #[test]
    fn qualified_names_are_kept_and_deduplicated() {
        let got = candidates(
            &strings(&["Acme.dev", "acme"]),
            &strings(&["dev", "com"]),
        )
        .unwrap();
        assert_eq!(got, strings(&["acme.dev", "acme.com"]));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let err = candidates(&strings(&["bad..name"]), &strings(&["com"])).unwrap_err();
        assert!(err.to_string().contains("not a valid domain"));
    }

    #[test]
    fn expiry_comes_from_rdap_events() {
        let body = r#"{
            "ldhName": "ACME.COM",
            "events": [
                {"eventAction": "registration", "eventDate": "1991-08-12T04:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2031-08-11T04:00:00Z"}
            ]
        }"#;
        let info: RdapDomain = serde_json::from_str(body).unwrap();
        assert_eq!(info.expires().as_deref(), Some("2031-08-11"));

        let registered = Availability::Registered {
            expires: info.expires(),
        };
        assert_eq!(registered.detail(), "expires 2031-08-11");
        assert_eq!(Availability::Available.status(), "available");
    }
}
