use std::fmt;

use serde::{Deserialize, Serialize};

/// Message classes defined by the messaging specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MessageClass {
    #[default]
    Command,
    Event,
    Document,
}

impl MessageClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageClass::Command => "Command",
            MessageClass::Event => "Event",
            MessageClass::Document => "Document",
        }
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message types understood by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    MetadataCreate,
    MetadataRead,
    MetadataUpdate,
    MetadataDelete,
    PreservationEvent,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::MetadataCreate => "MetadataCreate",
            MessageType::MetadataRead => "MetadataRead",
            MessageType::MetadataUpdate => "MetadataUpdate",
            MessageType::MetadataDelete => "MetadataDelete",
            MessageType::PreservationEvent => "PreservationEvent",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource types of a research object. The first value doubles as the
/// default so an undescribed object still serializes predictably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResourceType {
    #[default]
    #[serde(rename = "artDesignItem")]
    ArtDesignItem,
    #[serde(rename = "article")]
    Article,
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "book")]
    Book,
    #[serde(rename = "bookSection")]
    BookSection,
    #[serde(rename = "conferenceWorkshopItem")]
    ConferenceWorkshopItem,
    #[serde(rename = "dataset")]
    Dataset,
    #[serde(rename = "examPaper")]
    ExamPaper,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "journal")]
    Journal,
    #[serde(rename = "learningObject")]
    LearningObject,
    #[serde(rename = "movingImage")]
    MovingImage,
    #[serde(rename = "musicComposition")]
    MusicComposition,
    #[serde(rename = "other")]
    Other,
    #[serde(rename = "patent")]
    Patent,
    #[serde(rename = "performance")]
    Performance,
    #[serde(rename = "preprint")]
    Preprint,
    #[serde(rename = "report")]
    Report,
    #[serde(rename = "showExhibition")]
    ShowExhibition,
    #[serde(rename = "software")]
    Software,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "thesisDissertation")]
    ThesisDissertation,
    #[serde(rename = "website")]
    Website,
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ArtDesignItem => "artDesignItem",
            ResourceType::Article => "article",
            ResourceType::Audio => "audio",
            ResourceType::Book => "book",
            ResourceType::BookSection => "bookSection",
            ResourceType::ConferenceWorkshopItem => "conferenceWorkshopItem",
            ResourceType::Dataset => "dataset",
            ResourceType::ExamPaper => "examPaper",
            ResourceType::Image => "image",
            ResourceType::Journal => "journal",
            ResourceType::LearningObject => "learningObject",
            ResourceType::MovingImage => "movingImage",
            ResourceType::MusicComposition => "musicComposition",
            ResourceType::Other => "other",
            ResourceType::Patent => "patent",
            ResourceType::Performance => "performance",
            ResourceType::Preprint => "preprint",
            ResourceType::Report => "report",
            ResourceType::ShowExhibition => "showExhibition",
            ResourceType::Software => "software",
            ResourceType::Text => "text",
            ResourceType::ThesisDissertation => "thesisDissertation",
            ResourceType::Website => "website",
            ResourceType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ObjectValue {
    #[default]
    Normal,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PersonRoleType {
    #[default]
    Administrator,
    Author,
    ContactPerson,
    DataAnalyser,
    DataCollector,
    DataCreator,
    DataManager,
    Editor,
    Other,
    Producer,
    ProjectLeader,
    ProjectManager,
    ProjectMember,
    Publisher,
    RelatedPerson,
    Researcher,
    ResearchGroup,
    RightsHolder,
    Sponsor,
    Supervisor,
    WorkPackageLeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrganisationRoleType {
    #[default]
    Funder,
    HostingInstitution,
    Sponsor,
    Publisher,
    RegistrationAgency,
    RegistrationAuthority,
    Distributor,
    AwardingInstitution,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrganisationType {
    #[default]
    Charity,
    Commercial,
    Funder,
    FurtherEducation,
    Government,
    Health,
    Heritage,
    HigherEducation,
    Other,
    ProfessionalBody,
    Research,
    School,
    Skills,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DateType {
    #[default]
    Accepted,
    Approved,
    Available,
    Copyrighted,
    Collected,
    Created,
    Issued,
    Modified,
    Posted,
    Published,
    Submitted,
    Updated,
    Valid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IdentifierType {
    #[default]
    ARK,
    #[serde(rename = "arXiv")]
    ArXiv,
    #[serde(rename = "bibcode")]
    Bibcode,
    DOI,
    EAN13,
    EISSN,
    Handle,
    ISBN,
    ISSN,
    ISTC,
    LISSN,
    LSID,
    PMID,
    PURL,
    UPC,
    URL,
    URN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PersonIdentifierType {
    #[default]
    #[serde(rename = "ORCID")]
    Orcid,
    #[serde(rename = "researcherID")]
    ResearcherId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    #[default]
    Cites,
    IsCitedBy,
    Compiles,
    IsCompiledBy,
    Continues,
    IsContinuedBy,
    Documents,
    IsDocumentedBy,
    HasPart,
    IsPartOf,
    IsNewVersionOf,
    IsPreviousVersionOf,
    References,
    IsReferencedBy,
    HasVersion,
    IsVersionOf,
    IsVariantFormOf,
    IsOriginalFormOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DescriptionType {
    #[default]
    Abstract,
    Description,
    Methods,
    SeriesInformation,
    TableOfContents,
    TechnicalInfo,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AccessType {
    #[default]
    Open,
    Safeguarded,
    Controlled,
    Restricted,
    Closed,
}

/// Checksum algorithms accepted on file descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    #[default]
    Md5,
    Sha1,
    Sha256,
}

/// Storage platforms a file can be fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StorageType {
    #[default]
    HTTP,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UploadStatus {
    #[default]
    UploadStarted,
    UploadComplete,
    UploadAborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum StorageStatus {
    #[default]
    Online,
    Nearline,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FileUse {
    #[default]
    OriginalFile,
    ThumbnailFile,
    ExtractedText,
    PreservationMasterFile,
    IntermediateFile,
    ServiceFile,
    TranscriptionFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PackageType {
    #[default]
    AIP,
    DIP,
    SIP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    #[default]
    Zip,
    Tar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PreservationEventType {
    #[default]
    Capture,
    Creation,
    Deletion,
    FixityCheck,
    InformationPackageCreation,
    Ingestion,
    MessageDigestCalculation,
    MetadataModification,
    Normalisation,
    Validation,
    VirusCheck,
}
