use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::fetch;
use crate::message::enums::{
    ChecksumType, ContainerType, PackageType, PersonRoleType, PreservationEventType, RelationType,
};
use crate::message::{
    File, InformationPackage, Message, Person, PreservationEvent, PreservationEventRequest,
    ResearchObject,
};
use crate::pipeline::{self, Client, TransferSession};

use super::{Adapter, PROCESSING_CONFIG};

impl Adapter {
    /// Handles the reception of MetadataCreate messages: stages the dataset
    /// onto the tenant's pipeline, starts the transfer, waits for the AIP to
    /// be stored and publishes a PreservationEvent.
    pub(super) async fn handle_metadata_create(&self, msg: &Message) -> Result<()> {
        let body = msg.metadata_create_request()?;
        let tenant_id = msg.message_header.tenant_jisc_id;
        let client = self
            .registry()
            .get(tenant_id)
            .ok_or(AdapterError::UnknownTenant(tenant_id))?;
        let object = body.0.infer_research_object();

        let Some(transfer_id) = self.start_transfer(&client, object).await? else {
            // Messages with no files listed are ignored.
            return Ok(());
        };
        debug!(%transfer_id, "The transfer has started successfully");

        let object_uuid = object.object_uuid.map(|id| id.to_string()).unwrap_or_default();
        if let Err(err) = self.storage().associate(&object_uuid, &transfer_id).await {
            // The message must not be requeued at this point.
            error!("Error trying to persist the research object: {err}");
        }

        let token = self.cancellation_token();
        let aip_id = pipeline::wait_until_stored(token, &client, &transfer_id).await?;
        let aip_uuid = Uuid::parse_str(&aip_id)
            .map_err(|err| AdapterError::Pipeline(format!("SIP UUID is invalid: {err}")))?;

        self.broker()
            .preservation_event(PreservationEventRequest(InformationPackage {
                object_uuid: object.object_uuid,
                package_uuid: Some(aip_uuid),
                package_type: Some(PackageType::AIP),
                package_container_type: Some(ContainerType::Zip),
                package_description: String::new(),
                package_preservation_event: PreservationEvent {
                    preservation_event_value: Uuid::new_v4().to_string(),
                    preservation_event_type: Some(PreservationEventType::InformationPackageCreation),
                    preservation_event_detail: String::new(),
                },
            }))
            .await
            .map_err(|err| {
                AdapterError::Handler(format!("PreservationEvent message could not be sent: {err}"))
            })?;
        Ok(())
    }

    /// Handles the reception of MetadataUpdate messages. A message carrying
    /// an `isNewVersionOf` identifier known to the association store starts
    /// a fresh transfer; anything else is ignored.
    pub(super) async fn handle_metadata_update(&self, msg: &Message) -> Result<()> {
        let body = msg.metadata_update_request()?;
        let tenant_id = msg.message_header.tenant_jisc_id;
        let client = self
            .registry()
            .get(tenant_id)
            .ok_or(AdapterError::UnknownTenant(tenant_id))?;
        let object = body.0.infer_research_object();

        // If there is more than one match the others are not considered.
        let matched = object
            .object_related_identifier
            .iter()
            .find(|item| item.relation_type == RelationType::IsNewVersionOf)
            .filter(|item| !item.identifier.identifier_value.is_empty());
        let Some(matched) = matched else {
            debug!(message_id = %msg.id(), "Ignoring message");
            return Ok(());
        };

        let prior = self.storage().get(&matched.identifier.identifier_value).await;
        match prior {
            Ok(Some(transfer_id)) => {
                // TODO: real reingest; for now a fresh transfer is started.
                debug!(%transfer_id, "Reingesting transfer");
                self.start_transfer(&client, object).await?;
                Ok(())
            }
            Ok(None) => {
                warn!(
                    identifier = %matched.identifier.identifier_value,
                    "Cannot find associated object in the local store"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    identifier = %matched.identifier.identifier_value,
                    "Cannot fetch associated object from the local store: {err}"
                );
                Ok(())
            }
        }
    }

    /// Stages the dataset and starts the transfer. Returns None when the
    /// object lists no files.
    async fn start_transfer(
        &self,
        client: &Client,
        object: &ResearchObject,
    ) -> Result<Option<String>> {
        if object.object_file.is_empty() {
            return Ok(None);
        }
        let mut session = client
            .transfer_session(&object.object_title)
            .map_err(|err| AdapterError::Handler(format!("transfer session cannot be initialized: {err}")))?;
        session.with_processing_config(PROCESSING_CONFIG);

        describe_dataset(&mut session, object);

        for file in &object.object_file {
            // Checksums are recorded, not verified. Verification belongs to
            // the pipeline.
            for checksum in &file.file_checksum {
                match checksum.checksum_type {
                    ChecksumType::Md5 => session.checksum_md5(&file.file_name, &checksum.checksum_value),
                    ChecksumType::Sha256 => {
                        session.checksum_sha256(&file.file_name, &checksum.checksum_value)
                    }
                    ChecksumType::Sha1 => {}
                }
            }
            if let Err(err) = self.stage_file(&mut session, file).await {
                error!(file = %file.file_name, "Error staging file: {err}");
                if let Err(err) = session.destroy() {
                    warn!("Error destroying transfer: {err}");
                }
                return Err(err);
            }
        }

        let transfer_id = session
            .start()
            .await
            .map_err(|err| AdapterError::Handler(format!("transfer cannot be started: {err}")))?;
        Ok(Some(transfer_id))
    }

    /// Downloads one file into the transfer workspace and records its
    /// metadata.
    async fn stage_file(&self, session: &mut TransferSession<'_>, file: &File) -> Result<()> {
        if file.file_name.is_empty() {
            return Err(AdapterError::Handler("file has an empty fileName".into()));
        }
        let staged_name = format!("objects/{}", file.file_name);
        let mut target = session.create(&staged_name).await?;
        fetch::download(
            self.cancellation_token(),
            self.object_store().as_ref(),
            self.http(),
            &mut target,
            file.file_storage_platform.storage_platform_type,
            &file.file_storage_location,
        )
        .await?;
        describe_file(session, &staged_name, file);
        Ok(())
    }
}

/// Maps the properties of a research object into entries of the transfer's
/// `metadata.csv`.
pub(super) fn describe_dataset(session: &mut TransferSession<'_>, object: &ResearchObject) {
    session.describe("dc.title", &object.object_title);
    session.describe("dc.type", object.object_resource_type.as_str());

    // The identifier type is not mapped, the schema fixes it to DOI.
    for item in &object.object_identifier {
        session.describe("dc.identifier", &item.identifier_value);
    }

    for item in &object.object_date {
        if item.date_type != crate::message::enums::DateType::Published {
            continue;
        }
        let value = item.date_value.to_string();
        session.describe("dcterms.issued", &value);
        session.describe("dc.publicationYear", &value);
    }

    for item in &object.object_organisation_role {
        session.describe("dc.publisher", &item.organisation.organisation_name);
    }

    for item in &object.object_person_role {
        if item.role == PersonRoleType::DataCreator {
            session.describe("dc.creatorName", &person_name(&item.person));
        }
        if item.role == PersonRoleType::Publisher {
            session.describe("dc.publisher", &person_name(&item.person));
        }
    }
}

/// Maps the properties of a staged file into entries of `metadata.csv`.
pub(super) fn describe_file(session: &mut TransferSession<'_>, name: &str, file: &File) {
    session.describe_file(name, "dc.identifier", &file.file_identifier);
    session.describe_file(name, "dc.title", &file.file_name);
}

/// Joins the family and given names as `family, given`, falling back to
/// whichever part is present.
fn person_name(person: &Person) -> String {
    let given = person.person_given_names.as_str();
    let family = person.person_family_names.as_str();
    match (family.is_empty(), given.is_empty()) {
        (false, false) => format!("{family}, {given}"),
        (false, true) => family.to_string(),
        (true, false) => given.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::message::enums::{IdentifierType, ResourceType};
    use crate::message::{Identifier, PersonRole};

    struct Case {
        object: ResearchObject,
        expected_row: &'static str,
    }

    fn person_role(role: PersonRoleType, given: &str, family: &str) -> PersonRole {
        PersonRole {
            role,
            person: Person {
                person_given_names: given.to_string(),
                person_family_names: family.to_string(),
                ..Default::default()
            },
        }
    }

    fn doi(value: &str) -> Identifier {
        Identifier {
            identifier_value: value.to_string(),
            identifier_type: IdentifierType::DOI,
        }
    }

    fn metadata_rows(object: &ResearchObject) -> (String, String) {
        let base = tempfile::tempdir().unwrap();
        let client =
            Client::new("http://localhost:9000/api", "user", "key", base.path()).unwrap();
        let mut session = client.transfer_session("test").unwrap();

        describe_dataset(&mut session, object);
        fs::create_dir_all(session.path().join("metadata")).unwrap();
        session.metadata.write(session.path()).unwrap();

        let raw = fs::read_to_string(session.path().join("metadata/metadata.csv")).unwrap();
        let mut lines = raw.lines();
        let header = lines.next().unwrap_or_default().to_string();
        let row = lines.next().unwrap_or_default().to_string();
        (header, row)
    }

    #[test]
    fn metadata_generation_matches_expected_rows() {
        let cases = [
            Case {
                // No family name.
                object: ResearchObject {
                    object_title: "ObjectTitle1".into(),
                    object_person_role: vec![
                        person_role(PersonRoleType::DataCreator, "Kat", ""),
                        person_role(PersonRoleType::Publisher, "Joan", ""),
                    ],
                    object_identifier: vec![doi("10.5072/FK2/QAWS8O")],
                    ..Default::default()
                },
                expected_row: "objects/,Kat,10.5072/FK2/QAWS8O,Joan,ObjectTitle1,artDesignItem",
            },
            Case {
                // No given name.
                object: ResearchObject {
                    object_title: "ObjectTitle2".into(),
                    object_person_role: vec![
                        person_role(PersonRoleType::DataCreator, "", "Winter"),
                        person_role(PersonRoleType::Publisher, "", "Watson"),
                    ],
                    object_identifier: vec![doi("10.5072/FK2/QAWS81")],
                    ..Default::default()
                },
                expected_row: "objects/,Winter,10.5072/FK2/QAWS81,Watson,ObjectTitle2,artDesignItem",
            },
            Case {
                // Both names.
                object: ResearchObject {
                    object_title: "ObjectTitle3".into(),
                    object_person_role: vec![
                        person_role(PersonRoleType::DataCreator, "Kat", "Winter"),
                        person_role(PersonRoleType::Publisher, "Joan", "Watson"),
                    ],
                    object_identifier: vec![doi("10.5072/FK2/QAWS82")],
                    ..Default::default()
                },
                expected_row: "objects/,\"Winter, Kat\",10.5072/FK2/QAWS82,\"Watson, Joan\",ObjectTitle3,artDesignItem",
            },
            Case {
                // No matching roles.
                object: ResearchObject {
                    object_title: "ObjectTitle4".into(),
                    object_person_role: vec![
                        person_role(PersonRoleType::Editor, "Kat", "Winter"),
                        person_role(PersonRoleType::Other, "Joan", "Watson"),
                    ],
                    object_identifier: vec![doi("10.5072/FK2/QAWS83")],
                    ..Default::default()
                },
                expected_row: "objects/,10.5072/FK2/QAWS83,ObjectTitle4,artDesignItem",
            },
        ];

        for case in cases {
            let (_, row) = metadata_rows(&case.object);
            assert_eq!(row, case.expected_row, "title: {}", case.object.object_title);
        }
    }

    #[test]
    fn header_lists_filename_then_sorted_fields() {
        let object = ResearchObject {
            object_title: "ObjectTitle3".into(),
            object_resource_type: ResourceType::Dataset,
            object_person_role: vec![person_role(PersonRoleType::DataCreator, "Kat", "Winter")],
            object_identifier: vec![doi("10.5072/FK2/QAWS82")],
            ..Default::default()
        };
        let (header, _) = metadata_rows(&object);
        assert_eq!(header, "filename,dc.creatorName,dc.identifier,dc.title,dc.type");
    }

    #[test]
    fn describe_file_records_identifier_and_title() {
        let base = tempfile::tempdir().unwrap();
        let client =
            Client::new("http://localhost:9000/api", "user", "key", base.path()).unwrap();
        let mut session = client.transfer_session("test").unwrap();

        let file = File {
            file_identifier: "file-0001".into(),
            file_name: "data.bin".into(),
            ..Default::default()
        };
        describe_file(&mut session, "objects/data.bin", &file);

        let entries = session.metadata.entries();
        let entry = entries.get("objects/data.bin").unwrap();
        assert_eq!(
            entry,
            &vec![
                ("dc.identifier".to_string(), "file-0001".to_string()),
                ("dc.title".to_string(), "data.bin".to_string()),
            ]
        );
    }
}
