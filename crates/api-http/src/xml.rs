// UWS 1.1 / VOSI XML rendering — ported from `original_source/uws/responses.py`'s
// field set and per-result `sign_url` call site, built with `quick_xml::Writer`
// since no templating crate is present in the retrieved pack (SPEC_FULL.md
// §6.3). `ResultSigner` is invoked by the caller once per render, never here.

use chrono::{TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use std::io::Cursor;
use uws_core::domain::{ErrorType, Job, JobDescription, JobError, JobParameter, JobResultSigned};
use uws_core::port::job_store::Availability;

const UWS_NS: &str = "http://www.ivoa.net/xml/UWS/v1.0";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const VOSI_AVAILABILITY_NS: &str = "http://www.ivoa.net/xml/VOSIAvailability/v1.0";
const VOSI_CAPABILITIES_NS: &str = "http://www.ivoa.net/xml/VOSICapabilities/v1.0";

fn iso8601(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

fn new_writer() -> Writer<Cursor<Vec<u8>>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .expect("writing an XML declaration never fails");
    writer
}

fn finish(writer: Writer<Cursor<Vec<u8>>>) -> String {
    String::from_utf8(writer.into_inner().into_inner()).expect("quick-xml only emits valid UTF-8")
}

fn text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) {
    writer.write_event(Event::Start(BytesStart::new(name))).unwrap();
    writer.write_event(Event::Text(BytesText::new(text))).unwrap();
    writer.write_event(Event::End(BytesEnd::new(name))).unwrap();
}

fn write_parameters(writer: &mut Writer<Cursor<Vec<u8>>>, parameters: &[JobParameter]) {
    writer.write_event(Event::Start(BytesStart::new("uws:parameters"))).unwrap();
    for param in parameters {
        let mut start = BytesStart::new("uws:parameter");
        start.push_attribute(("id", param.id.as_str()));
        start.push_attribute(("byReference", "false"));
        writer.write_event(Event::Start(start)).unwrap();
        writer.write_event(Event::Text(BytesText::new(&param.value))).unwrap();
        writer.write_event(Event::End(BytesEnd::new("uws:parameter"))).unwrap();
    }
    writer.write_event(Event::End(BytesEnd::new("uws:parameters"))).unwrap();
}

fn write_results(writer: &mut Writer<Cursor<Vec<u8>>>, results: &[JobResultSigned]) {
    writer.write_event(Event::Start(BytesStart::new("uws:results"))).unwrap();
    for result in results {
        let mut start = BytesStart::new("uws:result");
        start.push_attribute(("id", result.result_id.as_str()));
        start.push_attribute(("xlink:href", result.url.as_str()));
        if let Some(mime_type) = &result.mime_type {
            start.push_attribute(("mime-type", mime_type.as_str()));
        }
        if let Some(size) = result.size {
            start.push_attribute(("size", size.to_string().as_str()));
        }
        writer.write_event(Event::Empty(start)).unwrap();
    }
    writer.write_event(Event::End(BytesEnd::new("uws:results"))).unwrap();
}

fn write_error_summary(writer: &mut Writer<Cursor<Vec<u8>>>, error: &JobError) {
    let mut start = BytesStart::new("uws:errorSummary");
    start.push_attribute((
        "type",
        match error.error_type {
            ErrorType::Fatal => "fatal",
            ErrorType::Transient => "transient",
        },
    ));
    start.push_attribute(("hasDetail", if error.detail.is_some() { "true" } else { "false" }));
    writer.write_event(Event::Start(start)).unwrap();
    text_element(writer, "uws:message", &error.message);
    writer.write_event(Event::End(BytesEnd::new("uws:errorSummary"))).unwrap();
}

/// Renders a full `uws:job` document. `results` must already be signed —
/// signing happens once, at the call site, never here (spec §4.2).
pub fn render_job(job: &Job, results: &[JobResultSigned]) -> String {
    let mut writer = new_writer();
    let mut root = BytesStart::new("uws:job");
    root.push_attribute(("xmlns:uws", UWS_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    writer.write_event(Event::Start(root)).unwrap();

    text_element(&mut writer, "uws:jobId", &job.job_id.to_string());
    text_element(&mut writer, "uws:ownerId", &job.owner);
    text_element(&mut writer, "uws:phase", &job.phase.to_string());
    if let Some(quote) = job.quote {
        text_element(&mut writer, "uws:quote", &iso8601(quote));
    }
    text_element(&mut writer, "uws:creationTime", &iso8601(job.creation_time));
    if let Some(start_time) = job.start_time {
        text_element(&mut writer, "uws:startTime", &iso8601(start_time));
    }
    if let Some(end_time) = job.end_time {
        text_element(&mut writer, "uws:endTime", &iso8601(end_time));
    }
    text_element(&mut writer, "uws:executionDuration", &job.execution_duration.to_string());
    text_element(&mut writer, "uws:destruction", &iso8601(job.destruction_time));
    write_parameters(&mut writer, &job.parameters);
    write_results(&mut writer, results);
    if let Some(error) = &job.error {
        write_error_summary(&mut writer, error);
    }
    if let Some(run_id) = &job.run_id {
        text_element(&mut writer, "uws:runId", run_id);
    }

    writer.write_event(Event::End(BytesEnd::new("uws:job"))).unwrap();
    finish(writer)
}

/// Renders the `uws:jobs` list document (`/jobs`).
pub fn render_job_list(descriptions: &[JobDescription], jobs_url: &str) -> String {
    let mut writer = new_writer();
    let mut root = BytesStart::new("uws:jobs");
    root.push_attribute(("xmlns:uws", UWS_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    writer.write_event(Event::Start(root)).unwrap();

    for description in descriptions {
        let mut jobref = BytesStart::new("uws:jobref");
        jobref.push_attribute(("id", description.job_id.to_string().as_str()));
        jobref.push_attribute(("xlink:href", format!("{jobs_url}/{}", description.job_id).as_str()));
        writer.write_event(Event::Start(jobref)).unwrap();
        text_element(&mut writer, "uws:phase", &description.phase.to_string());
        writer.write_event(Event::End(BytesEnd::new("uws:jobref"))).unwrap();
    }

    writer.write_event(Event::End(BytesEnd::new("uws:jobs"))).unwrap();
    finish(writer)
}

/// Renders `uws:parameters` standalone (`/jobs/{id}/parameters`).
pub fn render_parameters(parameters: &[JobParameter]) -> String {
    let mut writer = new_writer();
    write_parameters(&mut writer, parameters);
    finish(writer)
}

/// Renders `uws:results` standalone (`/jobs/{id}/results`).
pub fn render_results(results: &[JobResultSigned]) -> String {
    let mut writer = new_writer();
    write_results(&mut writer, results);
    finish(writer)
}

/// Renders VOSI `vosi:availability` (`/availability`).
pub fn render_availability(availability: &Availability) -> String {
    let mut writer = new_writer();
    let mut root = BytesStart::new("vosi:availability");
    root.push_attribute(("xmlns:vosi", VOSI_AVAILABILITY_NS));
    writer.write_event(Event::Start(root)).unwrap();
    text_element(&mut writer, "vosi:available", if availability.available { "true" } else { "false" });
    if let Some(note) = &availability.note {
        text_element(&mut writer, "vosi:note", note);
    }
    writer.write_event(Event::End(BytesEnd::new("vosi:availability"))).unwrap();
    finish(writer)
}

/// Renders VOSI `vosi:capabilities` (`/capabilities`), a minimal
/// self-describing document naming this service's own availability and
/// capabilities endpoints.
pub fn render_capabilities(path_prefix: &str) -> String {
    let mut writer = new_writer();
    let mut root = BytesStart::new("vosi:capabilities");
    root.push_attribute(("xmlns:vosi", VOSI_CAPABILITIES_NS));
    writer.write_event(Event::Start(root)).unwrap();

    for (standard_id, path) in [
        ("ivo://ivoa.net/std/VOSI#capabilities", "capabilities"),
        ("ivo://ivoa.net/std/VOSI#availability", "availability"),
    ] {
        let mut capability = BytesStart::new("capability");
        capability.push_attribute(("standardID", standard_id));
        writer.write_event(Event::Start(capability)).unwrap();
        text_element(&mut writer, "accessURL", &format!("{path_prefix}/{path}"));
        writer.write_event(Event::End(BytesEnd::new("capability"))).unwrap();
    }

    writer.write_event(Event::End(BytesEnd::new("vosi:capabilities"))).unwrap();
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uws_core::domain::{ErrorCode, JobParameter, Phase};

    fn sample_job() -> Job {
        Job::new(1, "alice", Some("run-1".into()), vec![JobParameter::new("Pos", "RANGE 0 360 -2 2", false)], 1_000, 3600, 60)
    }

    #[test]
    fn render_job_includes_phase_and_parameters() {
        let xml = render_job(&sample_job(), &[]);
        assert!(xml.contains("<uws:phase>PENDING</uws:phase>"));
        assert!(xml.contains(r#"<uws:parameter id="pos" byReference="false">RANGE 0 360 -2 2</uws:parameter>"#));
        assert!(xml.contains("<uws:runId>run-1</uws:runId>"));
    }

    #[test]
    fn render_job_includes_error_summary_when_failed() {
        let mut job = sample_job();
        job.phase = Phase::Error;
        job.error = Some(JobError {
            error_type: ErrorType::Fatal,
            error_code: ErrorCode::Other("BOOM".into()),
            message: "Error Whoops".into(),
            detail: Some("Some details".into()),
        });
        let xml = render_job(&job, &[]);
        assert!(xml.contains(r#"<uws:errorSummary type="fatal" hasDetail="true">"#));
        assert!(xml.contains("<uws:message>Error Whoops</uws:message>"));
    }

    #[test]
    fn render_job_list_contains_one_jobref_per_description() {
        let descriptions = vec![sample_job().description()];
        let xml = render_job_list(&descriptions, "https://example.test/jobs");
        assert!(xml.contains(r#"<uws:jobref id="1" xlink:href="https://example.test/jobs/1">"#));
    }
}
