use super::{card_template, fill_card_defaults, Engine, EngineContext, MatchPredicate};
use crate::extract::dom::{query_json, JsonRule};
use crate::extract::ExtractedData;
use crate::render::{require_any, Markup, Template};
use crate::OneboxError;
use async_trait::async_trait;
use url::Url;

const API_BASE: &str = "https://api.github.com/repos/";

const REPO_FIELDS: &[JsonRule] = &[
    JsonRule::new("title", "/full_name"),
    JsonRule::new("description", "/description"),
    JsonRule::new("image", "/owner/avatar_url"),
    JsonRule::new("stars", "/stargazers_count"),
    JsonRule::new("forks", "/forks_count"),
    JsonRule::new("language", "/language"),
    JsonRule::new("link", "/html_url"),
];

const STATS: &str = concat!(
    r#"<p class="github-stats">{{#language}}<span class="language">{{language}}</span> {{/language}}"#,
    r#"{{#stars}}<span class="stars">&#9733; {{stars}}</span> {{/stars}}"#,
    r#"{{#forks}}<span class="forks">{{forks}} forks</span>{{/forks}}</p>"#,
);

/// Repository front pages, read from the public REST API.
pub struct GithubRepoEngine {
    template: Template,
}

impl GithubRepoEngine {
    pub fn new() -> Result<Self, OneboxError> {
        Ok(Self {
            template: card_template("github-repo", STATS)?,
        })
    }
}

fn is_repo_path(path: &str) -> bool {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').skip(1).collect();
    segments.len() == 2 && segments.iter().all(|s| !s.is_empty())
}

/// `owner/repo` from a repository URL.
pub fn repo_slug(url: &Url) -> Option<(String, String)> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[async_trait]
impl Engine for GithubRepoEngine {
    fn name(&self) -> &'static str {
        "github_repo"
    }

    fn matcher(&self) -> Result<MatchPredicate, OneboxError> {
        Ok(MatchPredicate::And(vec![
            MatchPredicate::domains(["github.com"]),
            MatchPredicate::Path(is_repo_path),
        ]))
    }

    fn always_https(&self) -> bool {
        true
    }

    async fn extract(&self, ctx: &EngineContext<'_>) -> Result<ExtractedData, OneboxError> {
        let (owner, repo) = repo_slug(ctx.url)
            .ok_or_else(|| OneboxError::Extraction(format!("not a repository URL: {}", ctx.url)))?;
        let mut api = Url::parse(API_BASE).map_err(OneboxError::UrlParse)?;
        api.path_segments_mut()
            .map_err(|_| OneboxError::Extraction("API base cannot take a path".into()))?
            .pop_if_empty()
            .push(&owner)
            .push(&repo);

        let fetched = ctx.fetch(&api).await?;
        let mut data = query_json(&fetched.body, REPO_FIELDS);
        data.insert_text_if_absent("site_name", "GitHub");
        fill_card_defaults(&mut data, ctx.url);
        Ok(data)
    }

    fn to_html(
        &self,
        ctx: &EngineContext<'_>,
        data: &ExtractedData,
    ) -> Result<Option<Markup>, OneboxError> {
        if !require_any(data, &["title"]) {
            return Ok(None);
        }
        Ok(Some(self.template.render(data, &ctx.render_context())))
    }
}
