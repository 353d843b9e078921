//! `wl_region`: a set of rectangles for opaque and input regions.

use crate::error::Result;
use crate::object::{Dispatch, ObjectData, handle, no_events};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    RegionRequest("wl_region") {
        Destroy = 0,
        Add = 1,
        Subtract = 2,
    }
}

pub(crate) struct RegionData {
    pub(crate) version: u32,
}

impl RegionData {
    pub(crate) fn new(version: u32) -> Self {
        Self { version }
    }
}

impl Dispatch for RegionData {
    fn dispatch(&self, _conn: &Connection, _id: ObjectId, message: Message) -> Result<()> {
        no_events(Self::INTERFACE, &message)
    }
}

handle! {
    /// A region built from added and subtracted rectangles.
    ///
    /// The compositor copies the region when it is set on a surface, so it may be
    /// destroyed right after.
    Region => RegionData
}

impl Region {
    /// Adds a rectangle to the region.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="add">
    ///   <description summary="add rectangle to region">
    ///     Add the specified rectangle to the region.
    ///   </description>
    ///   <arg name="x" type="int" summary="region-local x coordinate"/>
    ///   <arg name="y" type="int" summary="region-local y coordinate"/>
    ///   <arg name="width" type="int" summary="rectangle width"/>
    ///   <arg name="height" type="int" summary="rectangle height"/>
    /// </request>
    /// ```
    pub fn add(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.rect(RegionRequest::Add, x, y, width, height)
    }

    /// Removes a rectangle from the region.
    pub fn subtract(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.rect(RegionRequest::Subtract, x, y, width, height)
    }

    fn rect(&self, request: RegionRequest, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let mut args = Encoder::new();
        args.int(x).int(y).int(width).int(height);
        self.conn.send_request(self.id, request, args)
    }

    /// Destroys the region. Surfaces that referenced it keep what was committed.
    pub fn destroy(self) -> Result<()> {
        self.conn
            .send_request(self.id, RegionRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        Ok(())
    }
}
