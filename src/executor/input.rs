use crate::browser::driver::PageDriver;
use crate::browser::locator::LocatorChain;
use crate::browser::resolver::ElementResolver;
use crate::errors::ScoutResult;

/// Resolves `chain` to an interactable element and clicks it.
pub async fn click_target<D: PageDriver>(
    resolver: &ElementResolver<'_, D>,
    chain: &LocatorChain,
) -> ScoutResult<()> {
    let element = resolver.resolve_and_wait(chain).await?;
    resolver.driver().click(&element).await?;
    tracing::debug!(ui_target = %chain.target, "clicked");
    Ok(())
}

/// Resolves `chain` to an interactable input and types `text` into it.
pub async fn type_text<D: PageDriver>(
    resolver: &ElementResolver<'_, D>,
    chain: &LocatorChain,
    text: &str,
    clear_first: bool,
) -> ScoutResult<()> {
    let element = resolver.resolve_and_wait(chain).await?;
    let driver = resolver.driver();
    if clear_first {
        driver.clear(&element).await?;
    }
    driver.send_keys(&element, text).await?;
    tracing::debug!(ui_target = %chain.target, chars = text.chars().count(), "text entered");
    Ok(())
}
