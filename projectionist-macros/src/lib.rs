use proc_macro::TokenStream;

mod event;
mod event_handler;

/// 事件宏
///
/// 为事件枚举实现 `::projectionist::event::DomainEvent`，并合并
/// `Debug, Clone, PartialEq, Serialize, Deserialize` 派生。
///
/// 支持键值形式：
/// - `#[event(version = N)]` 指定 `DomainEvent::event_version` 的默认版本号（默认 1）
/// - 变体可通过 `#[event(event_type = "...", event_version = N)]` 覆写事件类型与版本号；
///   未覆写时事件类型为 `"{Enum}.{Variant}"`
///
/// ```ignore
/// #[event]
/// enum AccountEvent {
///     #[event(event_type = "MoneyAdded")]
///     MoneyAdded { account_id: u64, amount: i64 },
///     MoneySubtracted { account_id: u64, amount: i64 },
/// }
/// ```
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    event::expand(attr, item)
}

/// 事件处理器宏
///
/// 标注在处理器的固有 impl 块上，收集带 `#[handles(..)]` 的方法并生成
/// `::projectionist::handler::HandlerMethods` 实现。`#[handles]` 不带参数时，
/// 方法只进入方法表，可用作 fallback 或在手写映射中引用。
///
/// ```ignore
/// #[event_handler]
/// impl BalanceProjector {
///     #[handles("MoneyAdded")]
///     async fn on_money_added(&self, event: &StoredEvent) -> anyhow::Result<()> {
///         // ...
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn event_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_handler::expand(attr, item)
}
