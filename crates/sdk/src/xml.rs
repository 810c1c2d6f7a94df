//! Minimal `uws:job` / `uws:jobs` readers, the inverse of
//! `crates/api-http/src/xml.rs`'s writer. Only the elements the client
//! surfaces are extracted; unknown elements are skipped.

use crate::error::{Result, SdkError};
use crate::types::{Job, JobErrorSummary, JobParameter, JobPhase, JobResult, JobSummary};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

fn attr(tag: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    tag.attributes().flatten().find_map(|a| {
        if a.key.as_ref() == name.as_bytes() {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(idx) => &qname[idx + 1..],
        None => qname,
    }
}

/// Parses a `uws:job` document body into a `Job`.
pub fn parse_job(xml: &str) -> Result<Job> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut job_id = None;
    let mut owner = String::new();
    let mut phase = JobPhase::Unknown;
    let mut run_id = None;
    let mut creation_time = String::new();
    let mut start_time = None;
    let mut end_time = None;
    let mut destruction_time = String::new();
    let mut execution_duration = 0i64;
    let mut quote = None;
    let mut parameters = Vec::new();
    let mut results = Vec::new();
    let mut error: Option<JobErrorSummary> = None;

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut current_param: Option<String> = None;
    let mut error_type = String::new();
    let mut error_message = String::new();
    let mut error_detail: Option<String> = None;

    loop {
        match reader.read_event().map_err(|e| SdkError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(tag) => {
                let name = local_name(tag.name().as_ref()).to_vec();
                match name.as_slice() {
                    b"parameter" => {
                        current_param = attr(&tag, "id");
                    }
                    b"errorSummary" => {
                        error_type = attr(&tag, "type").unwrap_or_default();
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(tag) => {
                let name = local_name(tag.name().as_ref());
                if name == b"result" {
                    results.push(JobResult {
                        result_id: attr(&tag, "id").unwrap_or_default(),
                        url: attr(&tag, "xlink:href").or_else(|| attr(&tag, "href")).unwrap_or_default(),
                        size: attr(&tag, "size").and_then(|s| s.parse().ok()),
                        mime_type: attr(&tag, "mime-type"),
                    });
                }
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| SdkError::Xml(e.to_string()))?.into_owned();
                match path.last().map(|v| v.as_slice()) {
                    Some(b"jobId") => job_id = value.parse().ok(),
                    Some(b"ownerId") => owner = value,
                    Some(b"phase") => phase = value.parse().unwrap_or(JobPhase::Unknown),
                    Some(b"runId") => run_id = Some(value),
                    Some(b"creationTime") => creation_time = value,
                    Some(b"startTime") => start_time = Some(value),
                    Some(b"endTime") => end_time = Some(value),
                    Some(b"destruction") => destruction_time = value,
                    Some(b"executionDuration") => execution_duration = value.parse().unwrap_or(0),
                    Some(b"quote") => quote = Some(value),
                    Some(b"parameter") => {
                        if let Some(id) = current_param.take() {
                            parameters.push(JobParameter { id, value });
                        }
                    }
                    Some(b"message") => error_message = value,
                    _ => {}
                }
            }
            Event::End(tag) => {
                let name = local_name(tag.name().as_ref());
                if name == b"errorSummary" {
                    error = Some(JobErrorSummary {
                        error_type: std::mem::take(&mut error_type),
                        message: std::mem::take(&mut error_message),
                        detail: error_detail.take(),
                    });
                }
                path.pop();
            }
            _ => {}
        }
    }

    Ok(Job {
        job_id: job_id.ok_or_else(|| SdkError::Xml("missing uws:jobId".to_string()))?,
        owner,
        phase,
        run_id,
        creation_time,
        start_time,
        end_time,
        destruction_time,
        execution_duration,
        quote,
        parameters,
        results,
        error,
    })
}

/// Parses a `uws:jobs` list document into job summaries.
pub fn parse_job_list(xml: &str) -> Result<Vec<JobSummary>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut summaries = Vec::new();
    let mut current: Option<(i64, String)> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event().map_err(|e| SdkError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(tag) => {
                let name = local_name(tag.name().as_ref()).to_vec();
                if name == b"jobref" {
                    let id = attr(&tag, "id").and_then(|s| s.parse().ok()).unwrap_or(0);
                    let href = attr(&tag, "xlink:href").or_else(|| attr(&tag, "href")).unwrap_or_default();
                    current = Some((id, href));
                }
                path.push(name);
            }
            Event::Text(text) => {
                if path.last().map(|v| v.as_slice()) == Some(b"phase") {
                    if let Some((job_id, href)) = current.clone() {
                        let value = text.unescape().map_err(|e| SdkError::Xml(e.to_string()))?.into_owned();
                        summaries.push(JobSummary {
                            job_id,
                            phase: value.parse().unwrap_or(JobPhase::Unknown),
                            href,
                        });
                    }
                }
            }
            Event::End(_) => {
                path.pop();
            }
            _ => {}
        }
    }

    Ok(summaries)
}
