//! Endpoint catalogue
//!
//! Thin async wrappers over [`ApiClient::send`]. Each returns the decoded
//! JSON document, or `None` when the call produced no data (transport
//! failure, token failure, empty or undecodable body). Response schemas are
//! left to the caller.

use fenixedu_domain::{BlueprintFormat, CalendarFormat};
use serde_json::Value;

use crate::client::ApiClient;
use crate::request::RequestDescriptor;

const ACADEMIC_TERM: &str = "academicTerm";

impl ApiClient {
    async fn fetch_json(&self, descriptor: RequestDescriptor) -> Option<Value> {
        self.send(descriptor).await.json()
    }

    // Public endpoints

    /// Institution information
    pub async fn about(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public("about")).await
    }

    /// Menus served at the main canteen
    pub async fn canteen(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public("canteen")).await
    }

    pub async fn course(&self, course_id: u64) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public(format!("courses/{course_id}"))).await
    }

    pub async fn course_evaluations(&self, course_id: u64) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public(format!("courses/{course_id}/evaluations")))
            .await
    }

    pub async fn course_groups(&self, course_id: u64) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public(format!("courses/{course_id}/groups"))).await
    }

    /// Students attending a course, with their degrees
    pub async fn course_students(&self, course_id: u64) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public(format!("courses/{course_id}/students"))).await
    }

    /// All degrees of an academic term (`"2015/2016"`), current term if `None`
    pub async fn degrees(&self, academic_term: Option<&str>) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public("degrees").param_opt(ACADEMIC_TERM, academic_term))
            .await
    }

    pub async fn degree(&self, degree_id: u64, academic_term: Option<&str>) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::public(format!("degrees/{degree_id}"))
                .param_opt(ACADEMIC_TERM, academic_term),
        )
        .await
    }

    pub async fn degree_courses(&self, degree_id: u64, academic_term: Option<&str>) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::public(format!("degrees/{degree_id}/courses"))
                .param_opt(ACADEMIC_TERM, academic_term),
        )
        .await
    }

    /// A space with its parent and contained spaces; the list of campi when
    /// `space_id` is `None`. `day` is `dd/mm/yyyy`.
    pub async fn space(&self, space_id: Option<&str>, day: Option<&str>) -> Option<Value> {
        let endpoint = match space_id {
            Some(id) => format!("spaces/{id}"),
            None => "spaces".to_string(),
        };
        self.fetch_json(RequestDescriptor::public(endpoint).param_opt("day", day)).await
    }

    /// Raw blueprint image of a space
    pub async fn space_blueprint(
        &self,
        space_id: &str,
        format: Option<BlueprintFormat>,
    ) -> Option<Vec<u8>> {
        let descriptor = RequestDescriptor::public(format!("spaces/{space_id}/blueprint"))
            .param_opt("format", format.map(|f| f.as_str()));
        let response = self.send(descriptor).await;
        response.bytes().map(<[u8]>::to_vec)
    }

    pub async fn shuttle(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public("shuttle")).await
    }

    /// Car park occupancy
    pub async fn parking(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::public("parking")).await
    }

    // Private endpoints

    /// The logged-in person
    pub async fn person(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::private("person")).await
    }

    /// Class schedule; `Calendar` yields an iCalendar document, which will not
    /// decode as JSON
    pub async fn person_classes_calendar(&self, format: CalendarFormat) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::private("person/calendar/classes").param("format", format.as_str()),
        )
        .await
    }

    pub async fn person_evaluations_calendar(&self, format: CalendarFormat) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::private("person/calendar/evaluations")
                .param("format", format.as_str()),
        )
        .await
    }

    pub async fn person_curriculum(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::private("person/curriculum")).await
    }

    pub async fn person_courses(&self, academic_term: Option<&str>) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::private("person/courses").param_opt(ACADEMIC_TERM, academic_term),
        )
        .await
    }

    pub async fn person_evaluations(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::private("person/evaluations")).await
    }

    pub async fn person_evaluation(&self, evaluation_id: &str) -> Option<Value> {
        self.fetch_json(RequestDescriptor::private(format!("person/evaluations/{evaluation_id}")))
            .await
    }

    /// Enrol in (or leave) a written evaluation; sent as `PUT`
    pub async fn enrol_in_evaluation(&self, evaluation_id: &str, should_enrol: bool) -> Option<Value> {
        self.fetch_json(
            RequestDescriptor::private(format!("person/evaluations/{evaluation_id}"))
                .param("enrol", if should_enrol { "yes" } else { "no" }),
        )
        .await
    }

    pub async fn person_payments(&self) -> Option<Value> {
        self.fetch_json(RequestDescriptor::private("person/payments")).await
    }
}
