//! `ServiceLevelObjective`: a goal over a service level indicator, owned by a
//! [`Service`](super::service).

use halyard_core::{Field, FieldKind, ObjectSchema, ResourceSchema, Union, UrlTemplates};

pub const UPDATE: &str = "updateServiceLevelObjective";
const U: &[&str] = &[UPDATE];

static AVAILABILITY: ObjectSchema = ObjectSchema {
    name: "availability",
    fields: &[],
    unions: &[],
};

static LATENCY: ObjectSchema = ObjectSchema {
    name: "latency",
    fields: &[
        Field::new("threshold", FieldKind::String).triggers(U),
        Field::new(
            "experience",
            FieldKind::Enum(&[
                "LATENCY_EXPERIENCE_UNSPECIFIED",
                "DELIGHTING",
                "SATISFYING",
                "ANNOYING",
            ]),
        )
        .triggers(U),
    ],
    unions: &[],
};

static BASIC_SLI: ObjectSchema = ObjectSchema {
    name: "basicSli",
    fields: &[
        Field::new("method", FieldKind::StringList).triggers(U),
        Field::new("location", FieldKind::StringList).triggers(U),
        Field::new("version", FieldKind::StringList).triggers(U),
        Field::new("availability", FieldKind::Object(&AVAILABILITY)).triggers(U),
        Field::new("latency", FieldKind::Object(&LATENCY)).triggers(U),
    ],
    unions: &[Union::at_most_one(&["availability", "latency"])],
};

static GOOD_TOTAL_RATIO: ObjectSchema = ObjectSchema {
    name: "goodTotalRatio",
    fields: &[
        Field::new("goodServiceFilter", FieldKind::String).triggers(U),
        Field::new("badServiceFilter", FieldKind::String).triggers(U),
        Field::new("totalServiceFilter", FieldKind::String).triggers(U),
    ],
    unions: &[],
};

static RANGE: ObjectSchema = ObjectSchema {
    name: "range",
    fields: &[
        Field::new("min", FieldKind::Double).triggers(U),
        Field::new("max", FieldKind::Double).triggers(U),
    ],
    unions: &[],
};

static DISTRIBUTION_CUT: ObjectSchema = ObjectSchema {
    name: "distributionCut",
    fields: &[
        Field::new("distributionFilter", FieldKind::String).triggers(U),
        Field::new("range", FieldKind::Object(&RANGE)).triggers(U),
    ],
    unions: &[],
};

static REQUEST_BASED: ObjectSchema = ObjectSchema {
    name: "requestBased",
    fields: &[
        Field::new("goodTotalRatio", FieldKind::Object(&GOOD_TOTAL_RATIO)).triggers(U),
        Field::new("distributionCut", FieldKind::Object(&DISTRIBUTION_CUT)).triggers(U),
    ],
    unions: &[Union::exactly_one(&["goodTotalRatio", "distributionCut"])],
};

static WINDOWS_BASED: ObjectSchema = ObjectSchema {
    name: "windowsBased",
    fields: &[
        Field::new("goodBadMetricFilter", FieldKind::String).triggers(U),
        Field::new("windowPeriod", FieldKind::String).triggers(U),
    ],
    unions: &[],
};

static SERVICE_LEVEL_INDICATOR: ObjectSchema = ObjectSchema {
    name: "serviceLevelIndicator",
    fields: &[
        Field::new("basicSli", FieldKind::Object(&BASIC_SLI)).triggers(U),
        Field::new("requestBased", FieldKind::Object(&REQUEST_BASED)).triggers(U),
        Field::new("windowsBased", FieldKind::Object(&WINDOWS_BASED)).triggers(U),
    ],
    unions: &[Union::at_most_one(&["basicSli", "requestBased", "windowsBased"])],
};

pub static SCHEMA: ResourceSchema = ResourceSchema {
    kind: "ServiceLevelObjective",
    root: ObjectSchema {
        name: "ServiceLevelObjective",
        fields: &[
            Field::new("name", FieldKind::Reference).required(),
            Field::new("displayName", FieldKind::String).triggers(U),
            Field::new(
                "serviceLevelIndicator",
                FieldKind::Object(&SERVICE_LEVEL_INDICATOR),
            )
            .triggers(U),
            Field::new("goal", FieldKind::Double)
                .required()
                .triggers(U),
            Field::new("rollingPeriod", FieldKind::String).triggers(U),
            Field::new(
                "calendarPeriod",
                FieldKind::Enum(&[
                    "CALENDAR_PERIOD_UNSPECIFIED",
                    "DAY",
                    "WEEK",
                    "FORTNIGHT",
                    "MONTH",
                    "QUARTER",
                    "HALF",
                    "YEAR",
                ]),
            )
            .triggers(U),
            Field::new("createTime", FieldKind::String).output_only(),
            Field::new("deleteTime", FieldKind::String).output_only(),
            Field::new("serviceManagementOwned", FieldKind::Bool).output_only(),
            Field::new("userLabels", FieldKind::StringMap).triggers(U),
            Field::new("project", FieldKind::Reference)
                .path_param()
                .required(),
            Field::new("service", FieldKind::Reference)
                .path_param()
                .required(),
        ],
        unions: &[Union::at_most_one(&["rollingPeriod", "calendarPeriod"])],
    },
    urls: UrlTemplates {
        get: "projects/{{project}}/services/{{service}}/serviceLevelObjectives/{{name}}",
        list: "projects/{{project}}/services/{{service}}/serviceLevelObjectives",
        create: "projects/{{project}}/services/{{service}}/serviceLevelObjectives?serviceLevelObjectiveId={{name}}",
        update: "projects/{{project}}/services/{{service}}/serviceLevelObjectives/{{name}}",
        delete: "projects/{{project}}/services/{{service}}/serviceLevelObjectives/{{name}}",
    },
    list_key: "serviceLevelObjectives",
    identity: &["project", "service", "name"],
    parent: &["project", "service"],
    server_generated_name: false,
    update_operations: &[UPDATE],
};

#[cfg(test)]
mod tests {
    use super::*;
    use halyard_core::Resource;
    use serde_json::json;

    #[test]
    fn availability_marker_is_sent_as_empty_object() {
        let slo = Resource::from_json(
            &SCHEMA,
            &json!({
                "project": "my-project",
                "service": "checkout",
                "name": "availability",
                "goal": 0.999,
                "rollingPeriod": "86400s",
                "serviceLevelIndicator": { "basicSli": { "availability": {} } },
            }),
        )
        .unwrap();
        slo.validate().unwrap();
        assert_eq!(
            serde_json::Value::Object(slo.to_body())["serviceLevelIndicator"],
            json!({ "basicSli": { "availability": {} } })
        );
    }

    #[test]
    fn rolling_and_calendar_period_are_exclusive() {
        let slo = Resource::from_json(
            &SCHEMA,
            &json!({
                "project": "my-project",
                "service": "checkout",
                "name": "latency",
                "goal": 0.95,
                "rollingPeriod": "86400s",
                "calendarPeriod": "WEEK",
            }),
        )
        .unwrap();
        assert!(slo.validate().is_err());
    }
}
