// self
use crate::{
	_prelude::*,
	auth::{LtiScope, ScopeSet},
	dispatch,
	error::ConfigError,
	http::{ServiceHttpClient, ServiceRequest},
	lti::{LINE_ITEM_MEDIA_TYPE, LineItemPayload, LineItemResponse, ServiceType},
	model::{Assessment, Deployment, LineItem},
	obs::{self, SyncKind, sync_event},
	sync::LtiSync,
};

impl<H> LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Creates or updates the LMS line item mirroring `assessment` and records its id.
	///
	/// The first call POSTs to the deployment's line-item container; later calls PUT to the
	/// recorded line item URL.
	pub async fn ensure_line_item(
		&self,
		deployment: &Deployment,
		assessment: &Assessment,
	) -> Result<LineItem> {
		obs::observe(SyncKind::LineItem, "ensure_line_item", async move {
			self.upsert_line_item(deployment, assessment).await.map(|(line_item, _)| line_item)
		})
		.await
	}

	/// Same as [`LtiSync::ensure_line_item`], also handing back the LMS-issued line item URL.
	pub(crate) async fn upsert_line_item(
		&self,
		deployment: &Deployment,
		assessment: &Assessment,
	) -> Result<(LineItem, Url)> {
		deployment.ensure_client(&self.client)?;

		let key = deployment.key();
		let mut line_item = self
			.store
			.find_line_item(&key, &assessment.id)
			.await?
			.unwrap_or_else(|| LineItem::pending(key.clone(), assessment.id.clone()));
		let form = LineItemPayload {
			label: assessment.description.clone(),
			resource_id: assessment.short_identifier.clone(),
			score_maximum: assessment.max_mark,
		}
		.to_form();
		let request = match &line_item.external_id {
			Some(external_id) => ServiceRequest::put_form(external_id.clone(), form),
			None => ServiceRequest::post_form(
				deployment.require_service(ServiceType::AgsLineItem)?.clone(),
				form,
			),
		}
		.with_accept(LINE_ITEM_MEDIA_TYPE);
		let scope = ScopeSet::from(LtiScope::AgsLineItem);
		let token = self.tokens.acquire(&scope).await?;
		let response = self.dispatcher.dispatch(&request, &token, &scope).await?;
		let returned: LineItemResponse = dispatch::decode_json(&request.uri, &response)?;
		let external_id = Url::parse(&returned.id).map_err(|source| {
			ConfigError::InvalidResourceUrl { url: returned.id.clone(), source: Some(source) }
		})?;

		sync_event!(
			debug,
			method = %request.method,
			assessment = %assessment.id,
			line_item = %external_id,
			"line item synchronized"
		);

		line_item.external_id = Some(external_id.clone());

		self.store.save_line_item(line_item.clone()).await?;

		Ok((line_item, external_id))
	}
}
