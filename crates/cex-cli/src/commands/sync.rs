//! 거래소 정보 동기화 명령어.

use anyhow::Result;
use tracing::info;

use cex_core::MarketKind;

use super::download::Exchange;

/// 거래소 정보를 동기화하고 요약을 출력합니다.
pub async fn sync_exchange(exchange: Exchange) -> Result<usize> {
    let mut source = exchange.make_source()?;
    source.sync_exchange_info().await?;

    let info = source.exchange_info();
    info!("Synced {} instruments from {}", info.len(), exchange.name());

    println!("\n거래소: {}", exchange.name());
    println!("전체 상품: {}", info.len());
    for market in [
        MarketKind::Spot,
        MarketKind::Margin,
        MarketKind::Perp,
        MarketKind::Futures,
    ] {
        let count = info.ids_by_market(market).len();
        if count > 0 {
            println!("  {}: {}", market, count);
        }
    }

    Ok(info.len())
}
