//! Declarative catalog of vendor actions.
//!
//! Each CMSV6 feature area exposes a handful of REST actions; every
//! one is described here as data (endpoint, parameter mapping,
//! optional convenience projection) and interpreted by the one
//! generic executor in [`crate::proxy`]. The session token is always
//! appended by the executor and never appears in these tables.

use std::collections::HashMap;
use std::fmt;

/// A caller-supplied parameter value. Presence in the parameter map
/// decides forwarding; `0` and `""` are forwarded like any other
/// value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Num(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Num(n)
    }
}

pub type Params = HashMap<String, ParamValue>;

/// How one caller-supplied key maps onto a vendor query parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub source: &'static str,
    pub vendor_name: &'static str,
    pub required: bool,
}

const fn req(source: &'static str, vendor_name: &'static str) -> ParamSpec {
    ParamSpec {
        source,
        vendor_name,
        required: true,
    }
}

const fn opt(source: &'static str, vendor_name: &'static str) -> ParamSpec {
    ParamSpec {
        source,
        vendor_name,
        required: false,
    }
}

/// One vendor action: where it lives and what it takes.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub params: &'static [ParamSpec],
    /// Field projected out of the envelope for caller convenience.
    pub project: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureArea {
    Device,
    Driver,
    Organization,
    Sim,
    Rule,
    Area,
    Report,
    VideoQuery,
    Video1078,
    Safety,
    Telemetry,
    Control,
}

const DEVICE_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "queryUserVehicle",
        endpoint: "StandardApiAction_queryUserVehicle.action",
        params: &[opt("vehicle", "vehiIdno"), opt("company", "companyName")],
        project: Some("vehicles"),
    },
    ActionSpec {
        name: "addDevice",
        endpoint: "StandardApiAction_addDevice.action",
        params: &[
            req("device", "devIdno"),
            opt("protocol", "protocol"),
            opt("factory", "factoryType"),
            opt("deviceType", "deviceType"),
            opt("sim", "simCard"),
        ],
        project: None,
    },
    ActionSpec {
        name: "editDevice",
        endpoint: "StandardApiAction_editDevice.action",
        params: &[
            req("device", "devIdno"),
            opt("name", "deviceName"),
            opt("protocol", "protocol"),
            opt("sim", "simCard"),
        ],
        project: None,
    },
    ActionSpec {
        name: "deleteDevice",
        endpoint: "StandardApiAction_deleteDevice.action",
        params: &[req("device", "devIdno")],
        project: None,
    },
];

const DRIVER_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "addDriver",
        endpoint: "StandardApiAction_addDriver.action",
        params: &[
            req("name", "driverName"),
            req("jobNumber", "jobNum"),
            opt("licence", "drivingLicense"),
            opt("phone", "phone"),
            opt("company", "companyName"),
        ],
        project: None,
    },
    ActionSpec {
        name: "editDriver",
        endpoint: "StandardApiAction_editDriver.action",
        params: &[
            req("jobNumber", "jobNum"),
            opt("name", "driverName"),
            opt("phone", "phone"),
        ],
        project: None,
    },
    ActionSpec {
        name: "deleteDriver",
        endpoint: "StandardApiAction_deleteDriver.action",
        params: &[req("jobNumber", "jobNum")],
        project: None,
    },
    ActionSpec {
        name: "queryDriver",
        endpoint: "StandardApiAction_queryDriver.action",
        params: &[
            opt("company", "companyName"),
            opt("page", "currentPage"),
            opt("pageSize", "pageRecords"),
        ],
        project: Some("drivers"),
    },
];

const ORGANIZATION_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "addCompany",
        endpoint: "StandardApiAction_addCompany.action",
        params: &[req("name", "companyName"), opt("parent", "parentCompanyName")],
        project: None,
    },
    ActionSpec {
        name: "editCompany",
        endpoint: "StandardApiAction_editCompany.action",
        params: &[req("name", "companyName"), opt("newName", "newCompanyName")],
        project: None,
    },
    ActionSpec {
        name: "deleteCompany",
        endpoint: "StandardApiAction_deleteCompany.action",
        params: &[req("name", "companyName")],
        project: None,
    },
    ActionSpec {
        name: "queryCompany",
        endpoint: "StandardApiAction_queryCompany.action",
        params: &[],
        project: Some("companies"),
    },
];

const SIM_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "addSim",
        endpoint: "StandardApiAction_addSim.action",
        params: &[
            req("sim", "simCard"),
            opt("iccid", "iccid"),
            opt("operator", "operator"),
        ],
        project: None,
    },
    ActionSpec {
        name: "editSim",
        endpoint: "StandardApiAction_editSim.action",
        params: &[req("sim", "simCard"), opt("operator", "operator")],
        project: None,
    },
    ActionSpec {
        name: "deleteSim",
        endpoint: "StandardApiAction_deleteSim.action",
        params: &[req("sim", "simCard")],
        project: None,
    },
    ActionSpec {
        name: "querySim",
        endpoint: "StandardApiAction_querySim.action",
        params: &[opt("page", "currentPage"), opt("pageSize", "pageRecords")],
        project: Some("sims"),
    },
];

const RULE_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "addRule",
        endpoint: "StandardApiAction_addRule.action",
        params: &[
            req("name", "ruleName"),
            req("ruleType", "ruleType"),
            opt("vehicle", "vehiIdno"),
        ],
        project: None,
    },
    ActionSpec {
        name: "editRule",
        endpoint: "StandardApiAction_editRule.action",
        params: &[req("rule", "ruleId"), opt("name", "ruleName")],
        project: None,
    },
    ActionSpec {
        name: "deleteRule",
        endpoint: "StandardApiAction_deleteRule.action",
        params: &[req("rule", "ruleId")],
        project: None,
    },
    ActionSpec {
        name: "queryRule",
        endpoint: "StandardApiAction_queryRule.action",
        params: &[opt("ruleType", "ruleType")],
        project: Some("rules"),
    },
];

const AREA_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "addArea",
        endpoint: "StandardApiAction_addArea.action",
        params: &[
            req("name", "areaName"),
            req("points", "points"),
            opt("areaType", "areaType"),
        ],
        project: None,
    },
    ActionSpec {
        name: "editArea",
        endpoint: "StandardApiAction_editArea.action",
        params: &[req("area", "areaId"), opt("points", "points")],
        project: None,
    },
    ActionSpec {
        name: "deleteArea",
        endpoint: "StandardApiAction_deleteArea.action",
        params: &[req("area", "areaId")],
        project: None,
    },
    ActionSpec {
        name: "queryArea",
        endpoint: "StandardApiAction_queryArea.action",
        params: &[],
        project: Some("areas"),
    },
];

const REPORT_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "queryMileageDetail",
        endpoint: "StandardApiAction_queryMileageDetail.action",
        params: &[
            req("vehicle", "vehiIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("page", "currentPage"),
            opt("pageSize", "pageRecords"),
        ],
        project: Some("mileage"),
    },
    ActionSpec {
        name: "queryAlarmDetail",
        endpoint: "StandardApiAction_queryAlarmDetail.action",
        params: &[
            req("vehicle", "vehiIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("alarmType", "armType"),
            opt("handled", "handle"),
            opt("page", "currentPage"),
            opt("pageSize", "pageRecords"),
        ],
        project: Some("alarms"),
    },
    ActionSpec {
        name: "queryParkDetail",
        endpoint: "StandardApiAction_queryParkDetail.action",
        params: &[
            req("vehicle", "vehiIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("parkMinutes", "parkTimeLen"),
        ],
        project: Some("parks"),
    },
];

const VIDEO_QUERY_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "getVideoFileInfo",
        endpoint: "StandardApiAction_getVideoFileInfo.action",
        params: &[
            req("device", "DevIDNO"),
            req("channel", "CHN"),
            req("year", "YEAR"),
            req("month", "MON"),
            req("day", "DAY"),
            opt("recordType", "RECTYPE"),
            opt("fileAttr", "FILEATTR"),
            opt("begin", "BEG"),
            opt("end", "END"),
            opt("stream", "STREAM"),
        ],
        project: Some("videos"),
    },
    ActionSpec {
        name: "queryPhotoList",
        endpoint: "StandardApiAction_queryPhotoList.action",
        params: &[
            req("device", "devIdno"),
            opt("begin", "begintime"),
            opt("end", "endtime"),
            opt("channel", "chn"),
        ],
        project: Some("photos"),
    },
];

const VIDEO_1078_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "startRealTimeVideo",
        endpoint: "StandardApiAction_startRealTimeVideo.action",
        params: &[
            req("device", "devIdno"),
            req("channel", "chn"),
            opt("stream", "streamType"),
            opt("mediaType", "mediaType"),
        ],
        project: None,
    },
    ActionSpec {
        name: "stopRealTimeVideo",
        endpoint: "StandardApiAction_stopRealTimeVideo.action",
        params: &[req("device", "devIdno"), req("channel", "chn")],
        project: None,
    },
    ActionSpec {
        name: "controlPtz",
        endpoint: "StandardApiAction_controlPtz.action",
        params: &[
            req("device", "devIdno"),
            req("channel", "chn"),
            req("command", "command"),
            opt("speed", "speed"),
        ],
        project: None,
    },
];

const SAFETY_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "queryAdasAlarm",
        endpoint: "StandardApiAction_queryAdasAlarm.action",
        params: &[
            req("device", "devIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("alarmType", "alarmType"),
        ],
        project: Some("alarms"),
    },
    ActionSpec {
        name: "queryDsmAlarm",
        endpoint: "StandardApiAction_queryDsmAlarm.action",
        params: &[
            req("device", "devIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("alarmType", "alarmType"),
        ],
        project: Some("alarms"),
    },
    ActionSpec {
        name: "handleSafetyAlarm",
        endpoint: "StandardApiAction_handleSafetyAlarm.action",
        params: &[
            req("alarm", "alarmId"),
            req("handleType", "handleType"),
            opt("remark", "remark"),
        ],
        project: None,
    },
];

const TELEMETRY_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "getDeviceStatus",
        endpoint: "StandardApiAction_getDeviceStatus.action",
        params: &[req("device", "devIdno"), opt("geocode", "geoaddress")],
        project: Some("status"),
    },
    ActionSpec {
        name: "getDeviceOlStatus",
        endpoint: "StandardApiAction_getDeviceOlStatus.action",
        params: &[opt("device", "devIdno"), opt("status", "status")],
        project: Some("onlines"),
    },
    ActionSpec {
        name: "queryTrackDetail",
        endpoint: "StandardApiAction_queryTrackDetail.action",
        params: &[
            req("device", "devIdno"),
            req("begin", "begintime"),
            req("end", "endtime"),
            opt("page", "currentPage"),
            opt("pageSize", "pageRecords"),
            opt("distanceFilter", "distanceFilter"),
        ],
        project: Some("tracks"),
    },
];

const CONTROL_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "sendTextMessage",
        endpoint: "StandardApiAction_sendTextMessage.action",
        params: &[
            req("device", "devIdno"),
            req("text", "text"),
            opt("flag", "flag"),
        ],
        project: None,
    },
    ActionSpec {
        name: "vehicleControl",
        endpoint: "StandardApiAction_vehicleControl.action",
        params: &[
            req("device", "devIdno"),
            req("commandType", "cmdType"),
            opt("commandParam", "cmdParam"),
        ],
        project: None,
    },
    ActionSpec {
        name: "cutOilElectricity",
        endpoint: "StandardApiAction_cutOilElectricity.action",
        params: &[req("device", "devIdno"), req("cutType", "type")],
        project: None,
    },
];

impl FeatureArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureArea::Device => "device",
            FeatureArea::Driver => "driver",
            FeatureArea::Organization => "organization",
            FeatureArea::Sim => "sim",
            FeatureArea::Rule => "rule",
            FeatureArea::Area => "area",
            FeatureArea::Report => "report",
            FeatureArea::VideoQuery => "video-query",
            FeatureArea::Video1078 => "video-1078",
            FeatureArea::Safety => "safety",
            FeatureArea::Telemetry => "telemetry",
            FeatureArea::Control => "control",
        }
    }

    pub fn actions(&self) -> &'static [ActionSpec] {
        match self {
            FeatureArea::Device => DEVICE_ACTIONS,
            FeatureArea::Driver => DRIVER_ACTIONS,
            FeatureArea::Organization => ORGANIZATION_ACTIONS,
            FeatureArea::Sim => SIM_ACTIONS,
            FeatureArea::Rule => RULE_ACTIONS,
            FeatureArea::Area => AREA_ACTIONS,
            FeatureArea::Report => REPORT_ACTIONS,
            FeatureArea::VideoQuery => VIDEO_QUERY_ACTIONS,
            FeatureArea::Video1078 => VIDEO_1078_ACTIONS,
            FeatureArea::Safety => SAFETY_ACTIONS,
            FeatureArea::Telemetry => TELEMETRY_ACTIONS,
            FeatureArea::Control => CONTROL_ACTIONS,
        }
    }

    pub fn find_action(&self, name: &str) -> Option<&'static ActionSpec> {
        self.actions().iter().find(|spec| spec.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_area_has_actions() {
        let areas = [
            FeatureArea::Device,
            FeatureArea::Driver,
            FeatureArea::Organization,
            FeatureArea::Sim,
            FeatureArea::Rule,
            FeatureArea::Area,
            FeatureArea::Report,
            FeatureArea::VideoQuery,
            FeatureArea::Video1078,
            FeatureArea::Safety,
            FeatureArea::Telemetry,
            FeatureArea::Control,
        ];
        for area in areas {
            assert!(!area.actions().is_empty(), "{} has no actions", area.as_str());
        }
    }

    #[test]
    fn action_names_unique_within_area() {
        for spec in FeatureArea::Report.actions() {
            let count = FeatureArea::Report
                .actions()
                .iter()
                .filter(|s| s.name == spec.name)
                .count();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn endpoints_follow_vendor_naming() {
        let areas = [
            FeatureArea::Device,
            FeatureArea::Driver,
            FeatureArea::Organization,
            FeatureArea::Sim,
            FeatureArea::Rule,
            FeatureArea::Area,
            FeatureArea::Report,
            FeatureArea::VideoQuery,
            FeatureArea::Video1078,
            FeatureArea::Safety,
            FeatureArea::Telemetry,
            FeatureArea::Control,
        ];
        for area in areas {
            for spec in area.actions() {
                assert!(spec.endpoint.starts_with("StandardApiAction_"));
                assert!(spec.endpoint.ends_with(".action"));
            }
        }
    }

    #[test]
    fn lookup_is_exact() {
        assert!(FeatureArea::Device.find_action("queryUserVehicle").is_some());
        assert!(FeatureArea::Device.find_action("queryuservehicle").is_none());
        assert!(FeatureArea::Driver.find_action("queryUserVehicle").is_none());
    }

    #[test]
    fn param_value_display() {
        assert_eq!(ParamValue::from("abc").to_string(), "abc");
        assert_eq!(ParamValue::from(0i64).to_string(), "0");
        assert_eq!(ParamValue::from("").to_string(), "");
    }
}
