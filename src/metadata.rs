//! `metadata.xml` documents of categories and packages.
//!
//! See [GLEP 68](https://www.gentoo.org/glep/glep-0068.html).

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Maintainer, RemoteId, Upstream};

/// The parts of a package's `metadata.xml` that are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub maintainers: Vec<Maintainer>,
    /// English long description, whitespace collapsed.
    pub longdescription: String,
    pub upstream: Upstream,
}

impl PackageMetadata {
    /// Parse a `<pkgmetadata>` document.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_history::PackageMetadata;
    ///
    /// let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
    /// <!DOCTYPE pkgmetadata SYSTEM "https://www.gentoo.org/dtd/metadata.dtd">
    /// <pkgmetadata>
    ///   <maintainer type="person">
    ///     <email>larry@gentoo.org</email>
    ///     <name>Larry the Cow</name>
    ///   </maintainer>
    ///   <upstream>
    ///     <remote-id type="github">gentoo/portage</remote-id>
    ///   </upstream>
    /// </pkgmetadata>"#;
    /// let metadata = PackageMetadata::parse(xml).unwrap();
    /// assert_eq!(metadata.maintainers[0].email, "larry@gentoo.org");
    /// assert_eq!(metadata.upstream.remote_ids[0].id, "gentoo/portage");
    /// ```
    pub fn parse(xml: &str) -> Result<PackageMetadata> {
        let doc: PkgMetadataXml = from_xml(xml)?;
        let upstream = doc.upstream.unwrap_or_default();
        Ok(PackageMetadata {
            maintainers: doc
                .maintainers
                .into_iter()
                .map(|m| Maintainer {
                    email: m.email.trim().to_string(),
                    name: m.name.trim().to_string(),
                    kind: m.kind,
                    restrict: m.restrict,
                })
                .collect(),
            longdescription: english(&doc.longdescriptions),
            upstream: Upstream {
                remote_ids: upstream
                    .remote_ids
                    .into_iter()
                    .map(|r| RemoteId {
                        kind: r.kind,
                        id: r.id.trim().to_string(),
                    })
                    .collect(),
                bugs_to: upstream.bugs_to,
                doc: upstream.doc,
                changelog: upstream.changelog,
            },
        })
    }
}

/// English long description of a `<catmetadata>` document.
pub fn category_description(xml: &str) -> Result<String> {
    let doc: CatMetadataXml = from_xml(xml)?;
    Ok(english(&doc.longdescriptions))
}

fn from_xml<'de, T: Deserialize<'de>>(xml: &'de str) -> Result<T> {
    quick_xml::de::from_str(xml).map_err(|e| Error::InvalidMetadata(e.to_string()))
}

/// The description without `lang` or with `lang="en"`.
fn english(descriptions: &[LongDescriptionXml]) -> String {
    descriptions
        .iter()
        .find(|d| d.lang.is_empty() || d.lang == "en")
        .map(LongDescriptionXml::text)
        .unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PkgMetadataXml {
    #[serde(rename = "maintainer")]
    maintainers: Vec<MaintainerXml>,
    #[serde(rename = "longdescription")]
    longdescriptions: Vec<LongDescriptionXml>,
    upstream: Option<UpstreamXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatMetadataXml {
    #[serde(rename = "longdescription")]
    longdescriptions: Vec<LongDescriptionXml>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MaintainerXml {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "@restrict")]
    restrict: String,
    email: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LongDescriptionXml {
    #[serde(rename = "@lang")]
    lang: String,
    #[serde(rename = "$value")]
    parts: Vec<DescriptionPart>,
}

/// Mixed content of a `<longdescription>`: text with `<pkg>`/`<cat>` references.
#[derive(Debug, Deserialize)]
enum DescriptionPart {
    #[serde(rename = "$text")]
    Text(String),
    #[serde(rename = "pkg")]
    Pkg(String),
    #[serde(rename = "cat")]
    Cat(String),
    #[serde(other)]
    Other,
}

impl LongDescriptionXml {
    /// Text of all parts, whitespace collapsed.
    fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            let text = match part {
                DescriptionPart::Text(s) | DescriptionPart::Pkg(s) | DescriptionPart::Cat(s) => s,
                DescriptionPart::Other => continue,
            };
            for word in text.split_whitespace() {
                if !out.is_empty() && !word.starts_with([',', '.', ';', ':', ')']) {
                    out.push(' ');
                }
                out.push_str(word);
            }
        }
        out
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamXml {
    #[serde(rename = "remote-id")]
    remote_ids: Vec<RemoteIdXml>,
    #[serde(rename = "bugs-to")]
    bugs_to: Vec<String>,
    doc: Vec<String>,
    changelog: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RemoteIdXml {
    #[serde(rename = "@type")]
    kind: String,
    #[serde(rename = "$text")]
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE pkgmetadata SYSTEM "https://www.gentoo.org/dtd/metadata.dtd">
<pkgmetadata>
	<maintainer type="project" restrict="&gt;=dev-lang/rust-1.80">
		<email>rust@gentoo.org</email>
		<name>Rust Project</name>
	</maintainer>
	<longdescription lang="de">Eine Sprache</longdescription>
	<longdescription>
		A language empowering everyone
		to build reliable software.
	</longdescription>
	<use>
		<flag name="clippy">Install clippy</flag>
	</use>
	<maintainer type="person">
		<email>dev@gentoo.org</email>
	</maintainer>
	<upstream>
		<remote-id type="github">rust-lang/rust</remote-id>
		<bugs-to>https://github.com/rust-lang/rust/issues</bugs-to>
		<doc>https://doc.rust-lang.org</doc>
	</upstream>
</pkgmetadata>
"#;

    #[test]
    fn parse_package() {
        let metadata = PackageMetadata::parse(PACKAGE).unwrap();
        assert_eq!(metadata.maintainers.len(), 2);
        assert_eq!(metadata.maintainers[0].kind, "project");
        assert_eq!(metadata.maintainers[0].restrict, ">=dev-lang/rust-1.80");
        assert_eq!(metadata.maintainers[0].name, "Rust Project");
        assert_eq!(metadata.maintainers[1].email, "dev@gentoo.org");
        assert_eq!(
            metadata.longdescription,
            "A language empowering everyone to build reliable software."
        );
        assert_eq!(metadata.upstream.remote_ids[0].kind, "github");
        assert_eq!(
            metadata.upstream.bugs_to,
            ["https://github.com/rust-lang/rust/issues"]
        );
        assert!(metadata.upstream.changelog.is_empty());
    }

    #[test]
    fn parse_minimal_package() {
        let metadata = PackageMetadata::parse("<pkgmetadata></pkgmetadata>").unwrap();
        assert_eq!(metadata, PackageMetadata::default());
    }

    #[test]
    fn parse_category() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<catmetadata>
	<longdescription lang="en">
		The dev-lang category contains various programming languages.
	</longdescription>
	<longdescription lang="de">
		Die Kategorie dev-lang enthält Programmiersprachen.
	</longdescription>
</catmetadata>"#;
        assert_eq!(
            category_description(xml).unwrap(),
            "The dev-lang category contains various programming languages."
        );
    }

    #[test]
    fn package_reference_inside_description() {
        let xml = "<pkgmetadata>\
            <maintainer type=\"person\"><email>dev@gentoo.org</email></maintainer>\
            <longdescription>A frontend for <pkg>dev-libs/foo</pkg> with extras.</longdescription>\
            </pkgmetadata>";
        let metadata = PackageMetadata::parse(xml).unwrap();
        assert_eq!(metadata.maintainers[0].email, "dev@gentoo.org");
        assert_eq!(metadata.longdescription, "A frontend for dev-libs/foo with extras.");
    }

    #[test]
    fn category_reference_inside_description() {
        let xml = r#"<catmetadata>
	<longdescription lang="en">
		Libraries split out of <cat>dev-libs</cat>, e.g. <pkg>dev-libs/bar</pkg>.
	</longdescription>
</catmetadata>"#;
        assert_eq!(
            category_description(xml).unwrap(),
            "Libraries split out of dev-libs, e.g. dev-libs/bar."
        );
    }

    #[test]
    fn malformed_xml() {
        assert!(matches!(
            PackageMetadata::parse("<pkgmetadata><maintainer>"),
            Err(Error::InvalidMetadata(_))
        ));
    }
}
