//! Typed schema for the learning-assets collection and the token endpoint.
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct AccessTokenResp {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// One page of the `learningAssets` collection.
#[derive(Deserialize, Debug, Clone)]
pub struct CatalogPage {
    pub elements: Vec<LearningAsset>,
    #[serde(default)]
    pub paging: Paging,
}

impl CatalogPage {
    /// The `href` of the first link with relation `next`.
    pub fn next_href(&self) -> Option<&str> {
        self.paging
            .links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href.as_str())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Paging {
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LearningAsset {
    pub urn: String,
    pub title: LocalizedString,
    pub details: AssetDetails,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LocalizedString {
    pub value: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetails {
    pub description: LocalizedString,
    pub urls: AssetUrls,
    #[serde(default)]
    pub images: AssetImages,
    #[serde(default)]
    pub available_locales: Vec<Locale>,
    /// Millisecond epoch timestamp.
    pub published_at: i64,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssetUrls {
    pub web_launch: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AssetImages {
    #[serde(default)]
    pub primary: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Locale {
    pub language: String,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub urn: String,
    pub name: LocalizedString,
    pub contribution_type: String,
}

impl Contributor {
    pub fn is_author(&self) -> bool {
        self.contribution_type == "AUTHOR"
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub associated_classification: ClassificationRef,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ClassificationRef {
    pub urn: String,
    pub name: LocalizedString,
    #[serde(rename = "type")]
    pub typ: String,
}

impl ClassificationRef {
    pub fn is_skill(&self) -> bool {
        self.typ == "SKILL"
    }
}
