use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ModelError, Result};
use crate::ids::ProjectId;

/// Interactive-login settings for a project whose pages sit behind a login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAuthConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProjectAuthConfig>,
    /// Extra pages to audit, absolute or relative to the site origin.
    #[serde(default)]
    pub pages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn requires_auth(&self) -> bool {
        self.auth.as_ref().is_some_and(|auth| auth.enabled)
    }

    /// Where the interactive login starts: the configured login URL, or the
    /// target URL when none is set.
    pub fn login_url(&self) -> &str {
        self.auth
            .as_ref()
            .and_then(|auth| auth.login_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub auth: Option<ProjectAuthConfig>,
    #[serde(default)]
    pub pages: Vec<String>,
}

impl CreateProjectRequest {
    pub fn into_project(self) -> Result<Project> {
        if self.name.trim().is_empty() {
            return Err(ModelError::MissingField("name"));
        }
        if self.url.trim().is_empty() {
            return Err(ModelError::MissingField("url"));
        }
        let url = validate_site_url(self.url.trim())?;
        let now = Utc::now();

        Ok(Project {
            id: ProjectId::new(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            url,
            auth: self.auth,
            pages: trimmed_pages(self.pages),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub auth: Option<ProjectAuthConfig>,
    pub pages: Option<Vec<String>>,
}

impl UpdateProjectRequest {
    pub fn apply(self, project: &mut Project) -> Result<()> {
        if let Some(url) = self.url {
            project.url = validate_site_url(url.trim())?;
        }
        if let Some(name) = self.name {
            if name.trim().is_empty() {
                return Err(ModelError::MissingField("name"));
            }
            project.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            project.description = description.trim().to_string();
        }
        if let Some(auth) = self.auth {
            project.auth = Some(auth);
        }
        if let Some(pages) = self.pages {
            project.pages = trimmed_pages(pages);
        }
        project.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_site_url(raw: &str) -> Result<String> {
    let parsed =
        Url::parse(raw).map_err(|_| ModelError::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(raw.to_string()),
        _ => Err(ModelError::InvalidUrl(raw.to_string())),
    }
}

fn trimmed_pages(pages: Vec<String>) -> Vec<String> {
    pages
        .into_iter()
        .map(|page| page.trim().to_string())
        .filter(|page| !page.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: "Site".into(),
            description: "desc".into(),
            url: url.into(),
            auth: None,
            pages: vec![" /about ".into(), "".into()],
        }
    }

    #[test]
    fn create_validates_url() {
        assert!(matches!(
            request("not a url").into_project(),
            Err(ModelError::InvalidUrl(_))
        ));
        assert!(matches!(
            request("ftp://example.com").into_project(),
            Err(ModelError::InvalidUrl(_))
        ));
        let project = request("https://example.com").into_project().unwrap();
        assert_eq!(project.pages, vec!["/about".to_string()]);
    }

    #[test]
    fn login_url_falls_back_to_target() {
        let mut project = request("https://example.com").into_project().unwrap();
        assert!(!project.requires_auth());
        project.auth = Some(ProjectAuthConfig {
            enabled: true,
            login_url: None,
        });
        assert!(project.requires_auth());
        assert_eq!(project.login_url(), "https://example.com");
        project.auth = Some(ProjectAuthConfig {
            enabled: true,
            login_url: Some("https://example.com/login".into()),
        });
        assert_eq!(project.login_url(), "https://example.com/login");
    }
}
