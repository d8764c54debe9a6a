#![forbid(unsafe_code)]

//! Tree-walk helpers shared by the renderer and the move protocol.

use blockline_core::{AstNode, BlockHost, BlockId, BlockInfo, ConnectionId, NodeKind};

/// Block plugged into `connection`, if any.
pub fn attached_block<H: BlockHost + ?Sized>(host: &H, connection: ConnectionId) -> Option<BlockId> {
    let target = host.connection(connection)?.target?;
    host.connection(target).map(|info| info.owner)
}

/// Whether the block is rendered inline by its parent instead of as a list
/// item: shadows, and expressions whose output feeds another block.
pub fn is_inline<H: BlockHost + ?Sized>(host: &H, block: &BlockInfo) -> bool {
    block.shadow
        || block
            .output
            .and_then(|output| host.connection(output))
            .is_some_and(|info| info.is_connected())
}

/// Topmost block reached by following structural parents.
pub fn root_block<H: BlockHost + ?Sized>(host: &H, id: BlockId) -> BlockId {
    let mut current = id;
    while let Some(parent) = host.parent_block(current) {
        current = parent;
    }
    current
}

/// Whether `ancestor` is `id` or lies on its structural parent chain.
pub fn is_ancestor_or_self<H: BlockHost + ?Sized>(host: &H, ancestor: BlockId, id: BlockId) -> bool {
    let mut current = Some(id);
    while let Some(block) = current {
        if block == ancestor {
            return true;
        }
        current = host.parent_block(block);
    }
    false
}

/// Nearest cursor ancestor of type `Block`.
pub fn nearest_block_ancestor<H: BlockHost + ?Sized>(host: &H, node: &AstNode) -> Option<AstNode> {
    let mut current = host.parent(node);
    while let Some(ancestor) = current {
        if ancestor.is_block() {
            return Some(ancestor);
        }
        current = host.parent(&ancestor);
    }
    None
}

/// Block-typed cursor ancestors, root first, followed by `node` itself when
/// it is a block.
pub fn block_trail<H: BlockHost + ?Sized>(host: &H, node: &AstNode) -> Vec<AstNode> {
    let mut trail: Vec<AstNode> = host
        .ancestors(node)
        .into_iter()
        .filter(AstNode::is_block)
        .collect();
    trail.reverse();
    if node.is_block() {
        trail.push(*node);
    }
    trail
}

/// The block a focused node stands for: the node itself for blocks, the top
/// block for stacks, the owning block for connections and fields.
pub fn focus_block<H: BlockHost + ?Sized>(host: &H, node: &AstNode) -> Option<BlockId> {
    match node.kind() {
        NodeKind::Workspace => None,
        NodeKind::Block | NodeKind::Stack => node.block_id(),
        _ => nearest_block_ancestor(host, node).and_then(|block| block.block_id()),
    }
}

/// Keyword of the construct whose closing boundary `node` is, if any.
///
/// The boundary is the construct's `Next` node. A construct without a next
/// connection closes at its last statement input instead.
pub fn closing_keyword<H: BlockHost + ?Sized>(host: &H, node: &AstNode) -> Option<&'static str> {
    let connection = node.connection_id()?;
    let info = host.connection(connection)?;
    let owner = host.block(info.owner)?;
    let keyword = owner.construct.keyword()?;
    match node.kind() {
        NodeKind::Next => Some(keyword),
        NodeKind::Input if owner.next.is_none() => {
            let last_body = owner.statement_inputs().filter_map(|input| input.connection).last();
            (last_body == Some(connection)).then_some(keyword)
        }
        _ => None,
    }
}
