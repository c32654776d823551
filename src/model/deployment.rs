// self
use crate::{
	_prelude::*,
	auth::{AssessmentId, ClientId, CourseId, DeploymentId},
	error::ConfigError,
	lti::ServiceType,
};

/// Unique key of a deployment: the platform's deployment id under one client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeploymentKey {
	/// Owning client.
	pub client: ClientId,
	/// Platform-issued deployment identifier.
	pub deployment: DeploymentId,
}

/// URL-addressed capability advertised by a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
	/// Capability the endpoint serves.
	pub service_type: ServiceType,
	/// Endpoint URL.
	pub url: Url,
}

/// Binding between one local course and one LMS installation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
	/// Owning client.
	pub client: ClientId,
	/// Platform-issued deployment identifier, unique per client.
	pub external_deployment_id: DeploymentId,
	/// Bound local course, if any.
	pub course: Option<CourseId>,
	/// Advertised service endpoints, at most one per service type.
	pub services: Vec<ServiceEndpoint>,
}
impl Deployment {
	/// Creates a deployment without course or services.
	pub fn new(client: ClientId, external_deployment_id: DeploymentId) -> Self {
		Self { client, external_deployment_id, course: None, services: Vec::new() }
	}

	/// Binds the deployment to a local course.
	pub fn with_course(mut self, course: CourseId) -> Self {
		self.course = Some(course);

		self
	}

	/// Registers or replaces the endpoint for `service_type`.
	pub fn with_service(mut self, service_type: ServiceType, url: Url) -> Self {
		self.services.retain(|service| service.service_type != service_type);
		self.services.push(ServiceEndpoint { service_type, url });

		self
	}

	/// Key identifying this deployment.
	pub fn key(&self) -> DeploymentKey {
		DeploymentKey {
			client: self.client.clone(),
			deployment: self.external_deployment_id.clone(),
		}
	}

	/// Returns the endpoint advertised for `service_type`.
	pub fn service(&self, service_type: ServiceType) -> Option<&ServiceEndpoint> {
		self.services.iter().find(|service| service.service_type == service_type)
	}

	/// Like [`Deployment::service`] but fails with [`Error::MissingService`].
	pub fn require_service(&self, service_type: ServiceType) -> Result<&Url> {
		self.service(service_type).map(|service| &service.url).ok_or_else(|| {
			Error::MissingService {
				deployment: self.external_deployment_id.clone(),
				service: service_type,
			}
		})
	}

	/// Fails unless the deployment belongs to `client`.
	pub fn ensure_client(&self, client: &ClientId) -> Result<()> {
		if &self.client == client {
			Ok(())
		} else {
			Err(ConfigError::ClientMismatch {
				engine_client: client.to_string(),
				deployment_client: self.client.to_string(),
			}
			.into())
		}
	}
}

/// Local mirror of one LMS gradebook column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
	/// Owning deployment.
	pub deployment: DeploymentKey,
	/// Mirrored assessment.
	pub assessment: AssessmentId,
	/// Line item URL assigned by the LMS; `None` until the first successful sync.
	pub external_id: Option<Url>,
}
impl LineItem {
	/// Creates a record that has not been synchronized yet.
	pub fn pending(deployment: DeploymentKey, assessment: AssessmentId) -> Self {
		Self { deployment, assessment, external_id: None }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn deployment() -> Deployment {
		Deployment::new(
			ClientId::new("client-1").expect("Client fixture should be valid."),
			DeploymentId::new("deployment-1").expect("Deployment fixture should be valid."),
		)
	}

	#[test]
	fn services_are_unique_per_type() {
		let deployment = deployment()
			.with_service(
				ServiceType::NamesRole,
				Url::parse("https://lms.example.com/old").expect("URL fixture should parse."),
			)
			.with_service(
				ServiceType::NamesRole,
				Url::parse("https://lms.example.com/new").expect("URL fixture should parse."),
			);

		assert_eq!(deployment.services.len(), 1);
		assert_eq!(
			deployment.require_service(ServiceType::NamesRole).map(Url::as_str).ok(),
			Some("https://lms.example.com/new")
		);
	}

	#[test]
	fn missing_service_names_the_deployment() {
		let err = deployment()
			.require_service(ServiceType::AgsLineItem)
			.expect_err("Deployment without services must fail.");

		assert!(matches!(err, Error::MissingService { service: ServiceType::AgsLineItem, .. }));
	}

	#[test]
	fn client_binding_is_enforced() {
		let other = ClientId::new("client-2").expect("Client fixture should be valid.");

		assert!(deployment().ensure_client(&other).is_err());
		assert!(deployment().ensure_client(&deployment().client).is_ok());
	}
}
