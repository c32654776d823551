// self
use crate::{
	_prelude::*,
	auth::{AccessToken, LtiScope, LtiUserId, ScopeSet, UserId},
	dispatch,
	error::ConfigError,
	http::{ServiceHttpClient, ServiceRequest},
	lti::{RESULT_CONTAINER_MEDIA_TYPE, ResultEntry, ScorePayload},
	model::{Assessment, Deployment, ReleasedMarks},
	obs::{self, SyncKind, sync_event},
	sync::LtiSync,
};

/// Tally of one grade sync pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSyncReport {
	/// Scores published to the LMS.
	pub pushed: usize,
	/// Scores the LMS already held.
	pub unchanged: usize,
	/// Marked users without an external link under the deployment's client.
	pub unlinked: usize,
}

impl<H> LtiSync<H>
where
	H: ?Sized + ServiceHttpClient,
{
	/// Publishes the released marks of `assessment` to the deployment's gradebook.
	///
	/// The line item is ensured first. Scores are only sent for users whose LMS result is
	/// missing or differs from the local mark, so repeating a pass without mark changes sends
	/// nothing.
	pub async fn sync_grades(
		&self,
		deployment: &Deployment,
		assessment: &Assessment,
	) -> Result<GradeSyncReport> {
		obs::observe(SyncKind::Grades, "sync_grades", async move {
			let (_, line_item_url) = self.upsert_line_item(deployment, assessment).await?;
			let scope = ScopeSet::lti([LtiScope::Score, LtiScope::ResultReadOnly]);
			let token = self.tokens.acquire(&scope).await?;
			let external = self.fetch_results(&line_item_url, &token, &scope).await?;
			let marks = self.marks.released_marks(assessment).await?;
			let mut report = GradeSyncReport::default();
			let mut local = BTreeMap::new();

			for (user, mark) in marks_by_user(marks) {
				match self.store.find_external_link(&user, &deployment.client).await? {
					Some(link) => {
						local.insert(link.lti_user_id, mark);
					},
					None => {
						sync_event!(debug, user = %user, "marked user has no external link");

						report.unlinked += 1;
					},
				}
			}

			let scores_url = sub_resource(&line_item_url, "scores")?;

			for (lti_user_id, mark) in local {
				if external.get(&lti_user_id).copied().flatten() == Some(mark) {
					report.unchanged += 1;

					continue;
				}

				let form = ScorePayload::completed(lti_user_id, mark, assessment.max_mark)
					.to_form()
					.map_err(ConfigError::from)?;
				let request = ServiceRequest::post_form(scores_url.clone(), form);

				self.dispatcher.dispatch(&request, &token, &scope).await?;

				report.pushed += 1;
			}

			sync_event!(
				info,
				assessment = %assessment.id,
				pushed = report.pushed,
				unchanged = report.unchanged,
				unlinked = report.unlinked,
				"grades synchronized"
			);

			Ok(report)
		})
		.await
	}

	async fn fetch_results(
		&self,
		line_item_url: &Url,
		token: &AccessToken,
		scope: &ScopeSet,
	) -> Result<HashMap<LtiUserId, Option<f64>>> {
		let request = ServiceRequest::get(sub_resource(line_item_url, "results")?)
			.with_accept(RESULT_CONTAINER_MEDIA_TYPE);
		let response = self.dispatcher.dispatch(&request, token, scope).await?;
		let results: Vec<ResultEntry> = dispatch::decode_json(&request.uri, &response)?;

		Ok(index_results(results))
	}
}

/// Flattens released marks into one score per local user.
fn marks_by_user(marks: ReleasedMarks) -> BTreeMap<UserId, f64> {
	match marks {
		ReleasedMarks::Assignment(groupings) => groupings
			.into_iter()
			.flat_map(|grouping| {
				let total = grouping.total_mark;

				grouping.members.into_iter().map(move |member| (member, total))
			})
			.collect(),
		ReleasedMarks::GradeEntryForm(entries) =>
			entries.into_iter().map(|entry| (entry.user, entry.total_grade)).collect(),
	}
}

/// Indexes LMS results by user. The first entry of a user wins; unusable ids are skipped.
fn index_results(results: Vec<ResultEntry>) -> HashMap<LtiUserId, Option<f64>> {
	let mut indexed = HashMap::with_capacity(results.len());

	for entry in results {
		match LtiUserId::new(entry.user_id.as_str()) {
			Ok(lti_user_id) => {
				indexed.entry(lti_user_id).or_insert(entry.result_score);
			},
			Err(e) => {
				sync_event!(debug, user_id = %entry.user_id, error = %e, "LMS result skipped");
			},
		}
	}

	indexed
}

/// Appends `segment` to the line item path, keeping its query string.
fn sub_resource(line_item: &Url, segment: &str) -> Result<Url> {
	let mut url = line_item.clone();

	url.path_segments_mut()
		.map_err(|_| ConfigError::InvalidResourceUrl { url: line_item.to_string(), source: None })?
		.pop_if_empty()
		.push(segment);

	Ok(url)
}
