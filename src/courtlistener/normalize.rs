//! # Response Normalization Module
//!
//! ## Purpose
//! Maps the three structurally distinct CourtListener response shapes
//! (opinion cluster, v4 search hit, citation-lookup match) into uniform
//! `CaseDocument` records. Structurally incomplete upstream records are
//! synthesized into usable documents rather than dropped.
//!
//! ## Input/Output Specification
//! - **Input**: Typed upstream records (see the module root)
//! - **Output**: Zero-or-more `CaseDocument`s per input record
//! - **Guarantee**: A cluster always yields at least one document
//!
//! ## Key Features
//! - One document per sub-opinion (majority, dissent, concurrence)
//! - Numeric opinion ids extracted from bare reference URLs, `"unknown"`
//!   placeholder when extraction fails
//! - Court-name inference from reporter abbreviations when the upstream
//!   record carries no court
//! - Opinion-kind classification with an explicit best-guess/unknown state

use crate::{CaseDocument, DocumentClass, DocumentSource, DocumentType};

use super::{
    CitationLookupMatch, ClusterCitation, OpinionCluster, OpinionRecord, SubOpinionRef,
    V4SearchHit,
};

const COURTLISTENER_WEB: &str = "https://www.courtlistener.com";

/// Normalize one opinion cluster into one document per sub-opinion.
///
/// Falls back to the legacy embedded `opinions` array, and finally to a
/// single document representing the case record itself, so search results
/// are never silently dropped for structurally incomplete records.
pub fn normalize_cluster(cluster: &OpinionCluster) -> Vec<CaseDocument> {
    let cluster_id = cluster
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut documents = Vec::new();

    for sub in &cluster.sub_opinions {
        match sub {
            SubOpinionRef::Embedded(opinion) => {
                documents.push(document_from_opinion(cluster, &cluster_id, opinion));
            }
            SubOpinionRef::Url(url) => {
                let opinion_id =
                    extract_opinion_id(url).unwrap_or_else(|| "unknown".to_string());
                documents.push(CaseDocument {
                    id: format!("cl-{}-{}", cluster_id, opinion_id),
                    doc_type: DocumentClass::BestGuess(DocumentType::Decision),
                    title: cluster_title(cluster),
                    court: infer_court(&cluster.citations),
                    docket_number: String::new(),
                    date: cluster.date_filed.clone().unwrap_or_default(),
                    page_count: 0,
                    source: DocumentSource::CourtListener,
                    download_url: None,
                    plain_text: None,
                    authors: split_judges(&cluster.judges),
                    is_selected: false,
                });
            }
        }
    }

    if documents.is_empty() {
        for opinion in &cluster.opinions {
            documents.push(document_from_opinion(cluster, &cluster_id, opinion));
        }
    }

    if documents.is_empty() {
        // No opinion data at all: emit the case record itself, carrying
        // whatever summary text the cluster has.
        let text = first_nonempty(&cluster.syllabus, &cluster.summary);
        documents.push(CaseDocument {
            id: format!("cl-{}", cluster_id),
            doc_type: DocumentClass::BestGuess(DocumentType::Decision),
            title: cluster_title(cluster),
            court: infer_court(&cluster.citations),
            docket_number: String::new(),
            date: cluster.date_filed.clone().unwrap_or_default(),
            page_count: 0,
            source: DocumentSource::CourtListener,
            download_url: cluster.absolute_url.as_deref().map(absolutize),
            plain_text: text,
            authors: split_judges(&cluster.judges),
            is_selected: false,
        });
    }

    documents
}

/// Normalize one v4 full-text search hit into a single document
pub fn normalize_v4_hit(hit: &V4SearchHit) -> CaseDocument {
    let cluster_id = hit
        .cluster_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let first_opinion = hit.opinions.first();

    CaseDocument {
        id: format!("cl-v4-{}", cluster_id),
        doc_type: classify_opinion_type(
            first_opinion.and_then(|op| op.opinion_type.as_deref()),
        ),
        title: hit.case_name.clone(),
        court: hit.court.clone(),
        docket_number: hit.docket_number.clone().unwrap_or_default(),
        date: hit.date_filed.clone().unwrap_or_default(),
        page_count: 0,
        source: DocumentSource::CourtListener,
        download_url: hit
            .absolute_url
            .as_deref()
            .map(absolutize)
            .or_else(|| first_opinion.and_then(|op| op.download_url.clone())),
        plain_text: non_empty(&hit.snippet),
        authors: Vec::new(),
        is_selected: false,
    }
}

/// Normalize one citation-lookup match by normalizing each matched cluster
pub fn normalize_lookup_match(lookup: &CitationLookupMatch) -> Vec<CaseDocument> {
    lookup.clusters.iter().flat_map(normalize_cluster).collect()
}

fn document_from_opinion(
    cluster: &OpinionCluster,
    cluster_id: &str,
    opinion: &OpinionRecord,
) -> CaseDocument {
    let opinion_id = opinion
        .id
        .map(|id| id.to_string())
        .or_else(|| {
            opinion
                .resource_uri
                .as_deref()
                .and_then(extract_opinion_id)
        })
        .unwrap_or_else(|| "unknown".to_string());

    let authors = match &opinion.author_str {
        Some(author) if !author.is_empty() => vec![author.clone()],
        _ => split_judges(&cluster.judges),
    };

    CaseDocument {
        id: format!("cl-{}-{}", cluster_id, opinion_id),
        doc_type: classify_opinion_type(opinion.opinion_type.as_deref()),
        title: cluster_title(cluster),
        court: infer_court(&cluster.citations),
        docket_number: String::new(),
        date: cluster.date_filed.clone().unwrap_or_default(),
        page_count: opinion.page_count.unwrap_or(0),
        source: DocumentSource::CourtListener,
        download_url: opinion.download_url.clone(),
        plain_text: opinion
            .plain_text
            .as_deref()
            .and_then(non_empty)
            .or_else(|| first_nonempty(&cluster.syllabus, &cluster.summary)),
        authors,
        is_selected: false,
    }
}

/// Classify an upstream opinion-type code.
///
/// CourtListener uses codes like `020lead`, `030concurrence`, `040dissent`
/// (older revisions: bare words). Missing data yields a best-guess decision;
/// an unrecognized code yields an explicit unknown.
pub fn classify_opinion_type(raw: Option<&str>) -> DocumentClass {
    let value = match raw {
        None => return DocumentClass::BestGuess(DocumentType::Decision),
        Some(value) => value.to_lowercase(),
    };

    if value.is_empty() {
        DocumentClass::BestGuess(DocumentType::Decision)
    } else if value.contains("dissent") {
        DocumentClass::Known(DocumentType::Dissent)
    } else if value.contains("concur") {
        DocumentClass::Known(DocumentType::Concurrence)
    } else if value.contains("lead")
        || value.contains("majority")
        || value.contains("combined")
        || value.contains("plurality")
        || value.contains("unanimous")
    {
        DocumentClass::Known(DocumentType::Decision)
    } else {
        DocumentClass::Unknown
    }
}

/// Extract the numeric opinion id from an API reference URL such as
/// `https://www.courtlistener.com/api/rest/v4/opinions/12345/`
pub fn extract_opinion_id(url: &str) -> Option<String> {
    let idx = url.find("/opinions/")?;
    let digits: String = url[idx + "/opinions/".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Infer a court name from reporter abbreviations. Applied only when the
/// upstream record carries no court of its own.
pub fn infer_court(citations: &[ClusterCitation]) -> String {
    for citation in citations {
        let reporter = citation.reporter.as_str();
        if reporter.contains("F. Supp") || reporter.contains("F.Supp") {
            return "U.S. District Court".to_string();
        }
        if reporter.contains("U.S.") || reporter.contains("S. Ct.") || reporter.contains("S.Ct.") {
            return "U.S. Supreme Court".to_string();
        }
        if reporter.starts_with("F.") {
            return "U.S. Court of Appeals".to_string();
        }
    }
    "Federal Court".to_string()
}

fn cluster_title(cluster: &OpinionCluster) -> String {
    if !cluster.case_name.is_empty() {
        cluster.case_name.clone()
    } else if !cluster.case_name_full.is_empty() {
        cluster.case_name_full.clone()
    } else {
        cluster
            .citations
            .first()
            .map(|c| c.display())
            .unwrap_or_default()
    }
}

fn absolutize(path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", COURTLISTENER_WEB, path)
    } else {
        path.to_string()
    }
}

fn split_judges(judges: &str) -> Vec<String> {
    judges
        .split([',', ';'])
        .map(|j| j.trim().to_string())
        .filter(|j| !j.is_empty())
        .collect()
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn first_nonempty(a: &str, b: &str) -> Option<String> {
    non_empty(a).or_else(|| non_empty(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with(sub_opinions: Vec<SubOpinionRef>, opinions: Vec<OpinionRecord>) -> OpinionCluster {
        OpinionCluster {
            id: Some(7),
            case_name: "Miller v. McDonald".to_string(),
            date_filed: Some("2019-12-10".to_string()),
            citations: vec![ClusterCitation {
                volume: Some(944),
                reporter: "F.3d".to_string(),
                page: Some("1050".to_string()),
            }],
            sub_opinions,
            opinions,
            syllabus: "Case syllabus text".to_string(),
            judges: "Smith, Jones".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn cluster_yields_one_document_per_sub_opinion() {
        let cluster = cluster_with(
            vec![
                SubOpinionRef::Url(
                    "https://www.courtlistener.com/api/rest/v4/opinions/101/".to_string(),
                ),
                SubOpinionRef::Embedded(OpinionRecord {
                    id: Some(102),
                    opinion_type: Some("040dissent".to_string()),
                    author_str: Some("Jones".to_string()),
                    ..Default::default()
                }),
            ],
            vec![],
        );

        let documents = normalize_cluster(&cluster);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, "cl-7-101");
        assert_eq!(documents[1].id, "cl-7-102");
        assert_eq!(
            documents[1].doc_type,
            DocumentClass::Known(DocumentType::Dissent)
        );
        assert_eq!(documents[1].authors, vec!["Jones".to_string()]);
    }

    #[test]
    fn unparseable_sub_opinion_url_falls_back_to_unknown() {
        let cluster = cluster_with(
            vec![SubOpinionRef::Url("https://example.com/nothing-here/".to_string())],
            vec![],
        );

        let documents = normalize_cluster(&cluster);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "cl-7-unknown");
    }

    #[test]
    fn legacy_opinions_array_is_used_when_sub_opinions_are_absent() {
        let cluster = cluster_with(
            vec![],
            vec![OpinionRecord {
                id: Some(55),
                opinion_type: Some("020lead".to_string()),
                plain_text: Some("Full opinion text".to_string()),
                page_count: Some(12),
                ..Default::default()
            }],
        );

        let documents = normalize_cluster(&cluster);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "cl-7-55");
        assert_eq!(
            documents[0].doc_type,
            DocumentClass::Known(DocumentType::Decision)
        );
        assert_eq!(documents[0].page_count, 12);
        assert_eq!(documents[0].plain_text.as_deref(), Some("Full opinion text"));
    }

    #[test]
    fn empty_cluster_still_yields_exactly_one_document() {
        let cluster = cluster_with(vec![], vec![]);

        let documents = normalize_cluster(&cluster);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "cl-7");
        assert_eq!(documents[0].plain_text.as_deref(), Some("Case syllabus text"));
        assert_eq!(documents[0].title, "Miller v. McDonald");
    }

    #[test]
    fn v4_hit_normalizes_with_source_prefixed_id() {
        let hit = V4SearchHit {
            cluster_id: Some(1),
            case_name: "Miller v. McDonald".to_string(),
            court: "Ninth Circuit".to_string(),
            docket_number: Some("18-35441".to_string()),
            date_filed: Some("2019-12-10".to_string()),
            snippet: "…remanded for further proceedings…".to_string(),
            absolute_url: Some("/opinion/1/miller-v-mcdonald/".to_string()),
            opinions: vec![],
        };

        let document = normalize_v4_hit(&hit);
        assert_eq!(document.id, "cl-v4-1");
        assert_eq!(
            document.doc_type,
            DocumentClass::BestGuess(DocumentType::Decision)
        );
        assert_eq!(document.court, "Ninth Circuit");
        assert_eq!(
            document.download_url.as_deref(),
            Some("https://www.courtlistener.com/opinion/1/miller-v-mcdonald/")
        );
        assert!(!document.is_selected);
    }

    #[test]
    fn lookup_match_flattens_all_clusters() {
        let lookup = CitationLookupMatch {
            citation: "944 F.3d 1050".to_string(),
            status: Some(200),
            error_message: String::new(),
            clusters: vec![cluster_with(vec![], vec![]), {
                let mut other = cluster_with(vec![], vec![]);
                other.id = Some(8);
                other
            }],
        };

        let documents = normalize_lookup_match(&lookup);
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].id, "cl-7");
        assert_eq!(documents[1].id, "cl-8");
    }

    #[test]
    fn opinion_type_classification_states() {
        assert_eq!(
            classify_opinion_type(Some("030concurrence")),
            DocumentClass::Known(DocumentType::Concurrence)
        );
        assert_eq!(
            classify_opinion_type(None),
            DocumentClass::BestGuess(DocumentType::Decision)
        );
        assert_eq!(classify_opinion_type(Some("xyzzy")), DocumentClass::Unknown);
    }

    #[test]
    fn court_inference_by_reporter() {
        let cite = |reporter: &str| ClusterCitation {
            volume: Some(1),
            reporter: reporter.to_string(),
            page: Some("1".to_string()),
        };

        assert_eq!(infer_court(&[cite("U.S.")]), "U.S. Supreme Court");
        assert_eq!(infer_court(&[cite("F.3d")]), "U.S. Court of Appeals");
        assert_eq!(infer_court(&[cite("F. Supp. 2d")]), "U.S. District Court");
        assert_eq!(infer_court(&[cite("P.2d")]), "Federal Court");
        assert_eq!(infer_court(&[]), "Federal Court");
    }
}
