//! Person Role Handler
//!
//! Person roles (and subtypes such as `GovernanceRole`) describe a position
//! people can be appointed to. Appointments are `PersonRoleAppointment`
//! relationships with the role at end 1 and the person at end 2.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::db::{DeleteResult, EntityQuery};
use crate::models::names::{properties, types};
use crate::models::{PersonRoleAppointee, PersonRoleElement};

use super::bean_factory::build_bean;
use super::builders::{AppointmentBuilder, PersonRoleBuilder};
use super::context::{validate_user, HandlerContext};
use super::element_handler::{CreateOptions, FindOptions, GenericHandler};
use super::error::{HandlerError, HandlerResult};
use super::policy::ReadFlags;
use super::relationship_handler::{AttachedEnd, EndSpec, RelationshipHandler};

const PERSON_ROLE_GUID: &str = "personRoleGUID";
const PERSON_GUID: &str = "personGUID";
const APPOINTMENT_GUID: &str = "appointmentGUID";

/// Person role and appointment operations
#[derive(Clone)]
pub struct PersonRoleHandler {
    roles: GenericHandler<PersonRoleElement>,
    relationships: RelationshipHandler,
}

impl PersonRoleHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self {
            roles: GenericHandler::new(ctx.clone()),
            relationships: RelationshipHandler::new(ctx),
        }
    }

    /// Generic operations (classification, zones) on person roles
    pub fn elements(&self) -> &GenericHandler<PersonRoleElement> {
        &self.roles
    }

    pub async fn create_person_role(
        &self,
        user_id: &str,
        builder: PersonRoleBuilder,
        options: CreateOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        self.roles
            .create_element(user_id, builder, options, effective_time)
            .await
    }

    /// Update a person role
    ///
    /// `domainIdentifier` is written only on a replace update whose supplied
    /// domain identifier is 0; in every other case any domain identifier set
    /// on the builder is dropped. A replace with a non-zero identifier
    /// therefore clears the stored one.
    pub async fn update_person_role(
        &self,
        user_id: &str,
        person_role_guid: &str,
        builder: PersonRoleBuilder,
        domain_identifier: i64,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        let builder = if !is_merge_update && domain_identifier == 0 {
            builder.with_domain_identifier(domain_identifier)
        } else {
            builder.without_domain_identifier()
        };
        self.roles
            .update_element(user_id, person_role_guid, PERSON_ROLE_GUID, builder, is_merge_update, effective_time)
            .await
    }

    /// Delete a person role; its appointments go with it
    pub async fn delete_person_role(
        &self,
        user_id: &str,
        person_role_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<DeleteResult> {
        self.roles
            .delete_element(user_id, person_role_guid, PERSON_ROLE_GUID, effective_time)
            .await
    }

    pub async fn find_person_roles(
        &self,
        user_id: &str,
        search_string: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<PersonRoleElement>> {
        self.roles
            .find_by_pattern(user_id, search_string, options, effective_time)
            .await
    }

    pub async fn get_person_roles_by_name(
        &self,
        user_id: &str,
        name: &str,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<PersonRoleElement>> {
        self.roles
            .find_by_name(user_id, name, &[], options, effective_time)
            .await
    }

    pub async fn get_person_role_by_guid(
        &self,
        user_id: &str,
        person_role_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<PersonRoleElement> {
        self.roles
            .get_by_guid(user_id, person_role_guid, PERSON_ROLE_GUID, effective_time)
            .await
    }

    /// Roles for a governance domain; 0 returns every role
    pub async fn get_person_roles_for_domain_id(
        &self,
        user_id: &str,
        domain_identifier: i64,
        options: FindOptions,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<PersonRoleElement>> {
        validate_user(user_id)?;
        let ctx = self.roles.context();
        let mut query = EntityQuery::new().with_type_names(ctx.types().subtypes_of(self.roles.type_name()));
        if domain_identifier != 0 {
            query = query.with_property_equals(properties::DOMAIN_IDENTIFIER, json!(domain_identifier));
        }
        self.roles
            .find_elements(user_id, query, "domainIdentifier", options, effective_time)
            .await
    }

    /// Appoint a person to a role; returns the appointment GUID
    pub async fn appoint_person_to_role(
        &self,
        user_id: &str,
        person_role_guid: &str,
        person_guid: &str,
        appointment: AppointmentBuilder,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<String> {
        self.relationships
            .link(
                user_id,
                EndSpec::new(person_role_guid, PERSON_ROLE_GUID, types::PERSON_ROLE),
                EndSpec::new(person_guid, PERSON_GUID, types::PERSON),
                types::PERSON_ROLE_APPOINTMENT,
                appointment.build(),
                appointment.window(),
                effective_time,
            )
            .await
    }

    pub async fn update_appointment(
        &self,
        user_id: &str,
        appointment_guid: &str,
        appointment: AppointmentBuilder,
        is_merge_update: bool,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        self.relationships
            .update_relationship_by_guid(
                user_id,
                appointment_guid,
                APPOINTMENT_GUID,
                types::PERSON_ROLE_APPOINTMENT,
                appointment.build(),
                Some(appointment.window()),
                is_merge_update,
                effective_time,
            )
            .await
    }

    /// End an appointment
    ///
    /// The appointment's end 1 must be `person_role_guid`; otherwise the call
    /// fails with `InvalidInput` naming `personRoleGUID` and nothing changes.
    pub async fn relieve_person_from_role(
        &self,
        user_id: &str,
        person_role_guid: &str,
        appointment_guid: &str,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<()> {
        validate_user(user_id)?;
        let appointment = self
            .relationships
            .get_relationship_by_guid(
                appointment_guid,
                APPOINTMENT_GUID,
                types::PERSON_ROLE_APPOINTMENT,
                effective_time,
            )
            .await?;

        if appointment.end1.guid != person_role_guid {
            return Err(HandlerError::invalid_input(
                PERSON_ROLE_GUID,
                format!(
                    "appointment {} belongs to role {}, not {}",
                    appointment_guid, appointment.end1.guid, person_role_guid
                ),
            ));
        }

        self.relationships
            .delete_relationship_by_guid(
                user_id,
                appointment_guid,
                APPOINTMENT_GUID,
                types::PERSON_ROLE_APPOINTMENT,
                effective_time,
            )
            .await
    }

    /// People appointed to a role
    pub async fn get_appointees(
        &self,
        user_id: &str,
        person_role_guid: &str,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<PersonRoleAppointee>> {
        self.relationships
            .find_attached(
                user_id,
                EndSpec::new(person_role_guid, PERSON_ROLE_GUID, types::PERSON_ROLE),
                types::PERSON_ROLE_APPOINTMENT,
                AttachedEnd::FromEnd1,
                types::PERSON,
                ReadFlags::default(),
                start_from,
                page_size,
                effective_time,
            )
            .await?
            .iter()
            .map(|(person, appointment)| build_bean(person, Some(appointment)))
            .collect()
    }

    /// Roles a person is appointed to
    pub async fn get_roles_for_person(
        &self,
        user_id: &str,
        person_guid: &str,
        start_from: usize,
        page_size: usize,
        effective_time: Option<DateTime<Utc>>,
    ) -> HandlerResult<Vec<PersonRoleElement>> {
        self.relationships
            .find_attached(
                user_id,
                EndSpec::new(person_guid, PERSON_GUID, types::PERSON),
                types::PERSON_ROLE_APPOINTMENT,
                AttachedEnd::FromEnd2,
                types::PERSON_ROLE,
                ReadFlags::default(),
                start_from,
                page_size,
                effective_time,
            )
            .await?
            .iter()
            .map(|(role, _)| build_bean(role, None))
            .collect()
    }
}
