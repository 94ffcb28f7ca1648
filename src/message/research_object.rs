use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::enums::{
    AccessType, ChecksumType, DateType, DescriptionType, FileUse, IdentifierType, ObjectValue,
    OrganisationRoleType, OrganisationType, PersonIdentifierType, PersonRoleType, RelationType,
    ResourceType, StorageStatus, StorageType, UploadStatus,
};
use super::timestamp::Timestamp;

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Person {
    #[serde(rename = "personUUID", default)]
    pub person_uuid: Option<Uuid>,
    #[serde(rename = "personIdentifier", default, skip_serializing_if = "Vec::is_empty")]
    pub person_identifier: Vec<PersonIdentifier>,
    #[serde(rename = "personHonorificPrefix", default, skip_serializing_if = "String::is_empty")]
    pub person_honorific_prefix: String,
    #[serde(rename = "personGivenNames", default)]
    pub person_given_names: String,
    #[serde(rename = "personFamilyNames", default)]
    pub person_family_names: String,
    #[serde(rename = "personHonorificSuffix", default, skip_serializing_if = "String::is_empty")]
    pub person_honorific_suffix: String,
    #[serde(rename = "personMail", default, skip_serializing_if = "String::is_empty")]
    pub person_mail: String,
    #[serde(rename = "personOrganisationUnit", default, skip_serializing_if = "Option::is_none")]
    pub person_organisation_unit: Option<OrganisationUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PersonIdentifier {
    #[serde(rename = "personIdentifierValue", default)]
    pub person_identifier_value: String,
    #[serde(rename = "personIdentifierType", default)]
    pub person_identifier_type: PersonIdentifierType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Organisation {
    #[serde(rename = "organisationJiscId", default)]
    pub organisation_jisc_id: u64,
    #[serde(rename = "organisationName", default)]
    pub organisation_name: String,
    #[serde(rename = "organisationType", default, skip_serializing_if = "Option::is_none")]
    pub organisation_type: Option<OrganisationType>,
    #[serde(rename = "organisationAddress", default, skip_serializing_if = "String::is_empty")]
    pub organisation_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrganisationUnit {
    #[serde(rename = "organisationUnitUUID", default)]
    pub organisation_unit_uuid: Option<Uuid>,
    #[serde(rename = "organisationUnitName", default)]
    pub organisation_unit_name: String,
    #[serde(default)]
    pub organisation: Organisation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PersonRole {
    #[serde(default)]
    pub person: Person,
    #[serde(default)]
    pub role: PersonRoleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrganisationRole {
    #[serde(default)]
    pub organisation: Organisation,
    #[serde(default)]
    pub role: OrganisationRoleType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Identifier {
    #[serde(rename = "identifierValue", default)]
    pub identifier_value: String,
    #[serde(rename = "identifierType", default)]
    pub identifier_type: IdentifierType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentifierRelationship {
    #[serde(default)]
    pub identifier: Identifier,
    #[serde(rename = "relationType", default)]
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Date {
    #[serde(rename = "dateValue", default)]
    pub date_value: Timestamp,
    #[serde(rename = "dateType", default)]
    pub date_type: DateType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObjectDescription {
    #[serde(rename = "descriptionValue", default)]
    pub description_value: String,
    #[serde(rename = "descriptionType", default)]
    pub description_type: DescriptionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Rights {
    #[serde(rename = "rightsStatement", default, skip_serializing_if = "Vec::is_empty")]
    pub rights_statement: Vec<String>,
    #[serde(rename = "rightsHolder", default, skip_serializing_if = "Vec::is_empty")]
    pub rights_holder: Vec<String>,
    #[serde(default)]
    pub licence: Vec<Licence>,
    #[serde(default)]
    pub access: Vec<Access>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Licence {
    #[serde(rename = "licenceName", default, skip_serializing_if = "String::is_empty")]
    pub licence_name: String,
    #[serde(rename = "licenceIdentifier", default)]
    pub licence_identifier: String,
    #[serde(rename = "licenseStartDate", default, skip_serializing_if = "Timestamp::is_zero")]
    pub licence_start_date: Timestamp,
    #[serde(rename = "licenseEndDate", default, skip_serializing_if = "Timestamp::is_zero")]
    pub licence_end_date: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Access {
    #[serde(rename = "accessType", default)]
    pub access_type: AccessType,
    #[serde(rename = "accessStatement", default, skip_serializing_if = "String::is_empty")]
    pub access_statement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Checksum {
    #[serde(rename = "checksumUUID", default, skip_serializing_if = "Option::is_none")]
    pub checksum_uuid: Option<Uuid>,
    #[serde(rename = "checksumType", default)]
    pub checksum_type: ChecksumType,
    #[serde(rename = "checksumValue", default)]
    pub checksum_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileStoragePlatform {
    #[serde(rename = "storagePlatformUUID", default)]
    pub storage_platform_uuid: Option<Uuid>,
    #[serde(rename = "storagePlatformName", default)]
    pub storage_platform_name: String,
    #[serde(rename = "storagePlatformType", default)]
    pub storage_platform_type: StorageType,
    #[serde(rename = "storagePlatformCost", default)]
    pub storage_platform_cost: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct File {
    #[serde(rename = "fileUUID", default)]
    pub file_uuid: Option<Uuid>,
    #[serde(rename = "fileIdentifier", default)]
    pub file_identifier: String,
    #[serde(rename = "fileName", default)]
    pub file_name: String,
    #[serde(rename = "fileSize", default)]
    pub file_size: u64,
    #[serde(rename = "fileLabel", default, skip_serializing_if = "String::is_empty")]
    pub file_label: String,
    #[serde(rename = "fileDateCreated", default, skip_serializing_if = "Option::is_none")]
    pub file_date_created: Option<Timestamp>,
    #[serde(rename = "fileRights", default, skip_serializing_if = "Option::is_none")]
    pub file_rights: Option<Rights>,
    #[serde(rename = "fileChecksum", default)]
    pub file_checksum: Vec<Checksum>,
    #[serde(rename = "fileFormatType", default, skip_serializing_if = "String::is_empty")]
    pub file_format_type: String,
    #[serde(rename = "fileCompositionLevel", default)]
    pub file_composition_level: String,
    #[serde(rename = "fileHasMimeType", default, skip_serializing_if = "is_false")]
    pub file_has_mime_type: bool,
    #[serde(rename = "fileDateModified", default)]
    pub file_date_modified: Vec<Timestamp>,
    #[serde(rename = "filePuid", default, skip_serializing_if = "Vec::is_empty")]
    pub file_puid: Vec<String>,
    #[serde(rename = "fileUse", default)]
    pub file_use: FileUse,
    #[serde(rename = "filePreservationEvent", default, skip_serializing_if = "String::is_empty")]
    pub file_preservation_event: String,
    #[serde(rename = "fileUploadStatus", default)]
    pub file_upload_status: UploadStatus,
    #[serde(rename = "fileStorageStatus", default)]
    pub file_storage_status: StorageStatus,
    #[serde(rename = "fileLastDownloaded", default, skip_serializing_if = "Option::is_none")]
    pub file_last_download: Option<Timestamp>,
    #[serde(rename = "fileTechnicalAttribute", default, skip_serializing_if = "Vec::is_empty")]
    pub file_technical_attribute: Vec<String>,
    #[serde(rename = "fileStorageLocation", default)]
    pub file_storage_location: String,
    #[serde(rename = "fileStoragePlatform", default)]
    pub file_storage_platform: FileStoragePlatform,
}

/// Common view of a research object, shared by every subtype. Handlers only
/// ever work against this projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResearchObject {
    #[serde(rename = "objectUUID", default)]
    pub object_uuid: Option<Uuid>,
    #[serde(rename = "objectTitle", default)]
    pub object_title: String,
    #[serde(rename = "objectPersonRole", default)]
    pub object_person_role: Vec<PersonRole>,
    #[serde(rename = "objectDescription", default, skip_serializing_if = "Vec::is_empty")]
    pub object_description: Vec<ObjectDescription>,
    #[serde(rename = "objectRights", default)]
    pub object_rights: Rights,
    #[serde(rename = "objectDate", default)]
    pub object_date: Vec<Date>,
    #[serde(rename = "objectKeyword", default, skip_serializing_if = "Vec::is_empty")]
    pub object_keyword: Vec<String>,
    #[serde(rename = "objectCategory", default, skip_serializing_if = "Vec::is_empty")]
    pub object_category: Vec<String>,
    #[serde(rename = "objectResourceType", default)]
    pub object_resource_type: ResourceType,
    #[serde(rename = "objectValue", default)]
    pub object_value: ObjectValue,
    #[serde(rename = "objectIdentifier", default)]
    pub object_identifier: Vec<Identifier>,
    #[serde(rename = "objectRelatedIdentifier", default, skip_serializing_if = "Vec::is_empty")]
    pub object_related_identifier: Vec<IdentifierRelationship>,
    #[serde(rename = "objectOrganisationRole", default)]
    pub object_organisation_role: Vec<OrganisationRole>,
    #[serde(rename = "objectFile", default, skip_serializing_if = "Vec::is_empty")]
    pub object_file: Vec<File>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FreeToRead {
    #[serde(rename = "startDate", default, skip_serializing_if = "Timestamp::is_zero")]
    pub start_date: Timestamp,
    #[serde(rename = "endDate", default, skip_serializing_if = "Timestamp::is_zero")]
    pub end_date: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Journal {
    #[serde(rename = "ISSN", default)]
    pub issn: String,
    #[serde(rename = "fullTitle", default, skip_serializing_if = "String::is_empty")]
    pub full_title: String,
    #[serde(rename = "journalVolume", default)]
    pub journal_volume: String,
    #[serde(rename = "firstPage", default)]
    pub first_page: String,
    #[serde(rename = "lastPage", default)]
    pub last_page: String,
    #[serde(rename = "journalIssue", default)]
    pub journal_issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeolocationPoint {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeospatialCoverage {
    #[serde(rename = "geolocationPoint", default, skip_serializing_if = "Option::is_none")]
    pub geolocation_point: Option<GeolocationPoint>,
    #[serde(rename = "geolocationPolygon", default, skip_serializing_if = "Vec::is_empty")]
    pub geolocation_polygon: Vec<GeolocationPoint>,
    #[serde(rename = "geolocationPlace", default, skip_serializing_if = "String::is_empty")]
    pub geolocation_place: String,
    #[serde(rename = "coordinateReferenceSystem", default, skip_serializing_if = "String::is_empty")]
    pub coordinate_reference_system: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Coverage {
    #[serde(rename = "geospatialCoverage", default, skip_serializing_if = "Vec::is_empty")]
    pub geospatial_coverage: Vec<GeospatialCoverage>,
    #[serde(rename = "temporalCoverageStart", default, skip_serializing_if = "Timestamp::is_zero")]
    pub temporal_coverage_start: Timestamp,
    #[serde(rename = "temporalCoverageEnd", default, skip_serializing_if = "Timestamp::is_zero")]
    pub temporal_coverage_end: Timestamp,
}

/// Article subtype. The common view is flattened so the extra fields sit
/// beside it on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Article {
    #[serde(flatten)]
    pub common: ResearchObject,
    #[serde(rename = "freeToRead", default, skip_serializing_if = "Option::is_none")]
    pub free_to_read: Option<FreeToRead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,
    #[serde(rename = "articleProcessingCharge", default, skip_serializing_if = "String::is_empty")]
    pub article_processing_charge: String,
    #[serde(rename = "publicationVersion", default, skip_serializing_if = "Vec::is_empty")]
    pub publication_version: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<Journal>,
}

/// Dataset subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Dataset {
    #[serde(flatten)]
    pub common: ResearchObject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// Thesis or dissertation subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ThesisDissertation {
    #[serde(flatten)]
    pub common: ResearchObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,
    #[serde(rename = "qualificationLevel", default, skip_serializing_if = "String::is_empty")]
    pub qualification_level: String,
    #[serde(rename = "qualificationName", default, skip_serializing_if = "String::is_empty")]
    pub qualification_name: String,
}

/// A research object of any subtype. Decoding picks the variant from
/// `objectResourceType`; encoding emits the held variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchObjectBase {
    Article(Box<Article>),
    Dataset(Box<Dataset>),
    ThesisDissertation(Box<ThesisDissertation>),
    Generic(Box<ResearchObject>),
}

impl Default for ResearchObjectBase {
    fn default() -> Self {
        ResearchObjectBase::Generic(Box::default())
    }
}

impl ResearchObjectBase {
    /// Projects the common fields into a generic [`ResearchObject`] view.
    pub fn infer_research_object(&self) -> &ResearchObject {
        match self {
            ResearchObjectBase::Article(a) => &a.common,
            ResearchObjectBase::Dataset(d) => &d.common,
            ResearchObjectBase::ThesisDissertation(t) => &t.common,
            ResearchObjectBase::Generic(r) => r,
        }
    }
}

impl From<ResearchObject> for ResearchObjectBase {
    fn from(object: ResearchObject) -> Self {
        ResearchObjectBase::Generic(Box::new(object))
    }
}

impl Serialize for ResearchObjectBase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResearchObjectBase::Article(a) => a.serialize(serializer),
            ResearchObjectBase::Dataset(d) => d.serialize(serializer),
            ResearchObjectBase::ThesisDissertation(t) => t.serialize(serializer),
            ResearchObjectBase::Generic(r) => r.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ResearchObjectBase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let kind = value
            .get("objectResourceType")
            .and_then(|v| v.as_str())
            .map(|v| serde_json::from_value::<ResourceType>(serde_json::Value::String(v.to_owned())))
            .transpose()
            .map_err(D::Error::custom)?
            .unwrap_or_default();
        let base = match kind {
            ResourceType::Article => ResearchObjectBase::Article(
                serde_json::from_value(value).map_err(D::Error::custom)?,
            ),
            ResourceType::Dataset => ResearchObjectBase::Dataset(
                serde_json::from_value(value).map_err(D::Error::custom)?,
            ),
            ResourceType::ThesisDissertation => ResearchObjectBase::ThesisDissertation(
                serde_json::from_value(value).map_err(D::Error::custom)?,
            ),
            _ => ResearchObjectBase::Generic(
                serde_json::from_value(value).map_err(D::Error::custom)?,
            ),
        };
        Ok(base)
    }
}
