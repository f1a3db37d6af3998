//! `quickevent add`.

use crate::cli::AddArgs;
use crate::config::ClientConfig;
use crate::controller::FormController;
use crate::error::ClientResult;

/// Creates the event described by `args` and prints its link.
///
/// The draft is checked before the configuration is touched, so an
/// incomplete form never resolves secrets or starts authentication.
pub async fn run(args: &AddArgs, config: &ClientConfig) -> ClientResult<()> {
    let draft = args.to_draft();
    draft.validate()?;

    let controller = FormController::from_config(config)?;
    let link = controller.submit(draft).await?;

    println!("Event created: {}", link);
    Ok(())
}
